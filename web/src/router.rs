use crate::controller::{broadcast_controller, health_check_controller};
use crate::{sse, ws, AppState};
use axum::http::header::{HeaderValue, CACHE_CONTROL, CONNECTION};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

/// API router: broadcast trigger, health check, and the SSE stream.
pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(trigger_routes(app_state.clone()))
        .merge(health_routes(app_state.clone()))
        .merge(events_routes(app_state))
}

/// Duplex-channel router, served on the fixed WebSocket port.
pub fn define_duplex_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::handler::ws_upgrade))
        .with_state(app_state)
}

fn trigger_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(broadcast_controller::trigger))
        .route("/api", get(broadcast_controller::trigger))
        .with_state(app_state)
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn events_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/events", get(sse::handler::sse_handler))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            CONNECTION,
            HeaderValue::from_static("keep-alive"),
        ))
        // Event streams are consumed cross-origin by browser frontends
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ws;
    use axum::http::{Request, StatusCode};
    use clap::Parser;
    use futures::StreamExt;
    use relay::connection::Connection;
    use relay::Dispatcher;
    use serde_json::Value;
    use service::config::Config;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config::parse_from(["fanout_relay"]);
        AppState::new(config, &Arc::new(Dispatcher::new()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check_with_no_clients() {
        let app = define_routes(test_state());
        let (status, value) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "OK");
        assert_eq!(value["connectedClients"]["total"], 0);
        assert!(value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_health_check_counts_both_transports() {
        let state = test_state();
        let (ws_tx, _ws_rx) = mpsc::unbounded_channel();
        let (sse_tx, _sse_rx) = mpsc::unbounded_channel();
        state.dispatcher.register(Connection::duplex(ws_tx));
        state.dispatcher.register(Connection::push_stream(sse_tx));

        let (status, value) = get_json(define_routes(state), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["connectedClients"]["websocket"], 1);
        assert_eq!(value["connectedClients"]["sse"], 1);
        assert_eq!(value["connectedClients"]["total"], 2);
    }

    #[tokio::test]
    async fn test_trigger_succeeds_with_no_clients() {
        let app = define_routes(test_state());
        let (status, value) = get_json(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "GET request processed successfully");
        assert_eq!(value["broadcastedTo"]["total"], 0);
    }

    #[tokio::test]
    async fn test_api_alias_broadcasts_to_registered_client() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.dispatcher.register(Connection::duplex(tx));

        let (status, value) = get_json(define_routes(state), "/api").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["broadcastedTo"]["websocket"], 1);
        assert_eq!(value["broadcastedTo"]["total"], 1);

        // The registered client received the literal broadcast text
        match rx.recv().await.unwrap() {
            ws::Message::Text(text) => {
                assert_eq!(text, broadcast_controller::BROADCAST_PAYLOAD)
            }
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_events_endpoint_opens_an_event_stream() {
        let state = test_state();
        let response = define_routes(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["cache-control"], "no-cache");
        assert_eq!(response.headers()["connection"], "keep-alive");
        // The push-stream client was registered before the response head
        // was returned
        assert_eq!(state.dispatcher.client_counts().sse, 1);
    }

    /// The `data:` payload of a wire-format event frame.
    fn data_line(frame: &str) -> String {
        frame
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("frame has a data line")
            .to_string()
    }

    #[tokio::test]
    async fn test_event_stream_frames_are_classified_on_the_wire() {
        let state = test_state();
        let response = define_routes(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let mut body = response.into_body().into_data_stream();

        // The greeting queued at registration is the first frame out
        let chunk = body.next().await.unwrap().unwrap();
        let frame = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(
            frame.contains("event: connection"),
            "unexpected frame: {frame}"
        );
        let value: Value = serde_json::from_str(&data_line(&frame)).unwrap();
        assert_eq!(value["type"], "connection");

        // Trigger a broadcast; the open stream observes it
        let (status, trigger) = get_json(define_routes(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trigger["broadcastedTo"]["sse"], 1);

        let chunk = body.next().await.unwrap().unwrap();
        let frame = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(
            frame.contains("event: broadcast"),
            "unexpected frame: {frame}"
        );
        let value: Value = serde_json::from_str(&data_line(&frame)).unwrap();
        assert_eq!(value["type"], "broadcast");
        assert_eq!(value["message"], broadcast_controller::BROADCAST_PAYLOAD);
    }

    #[tokio::test]
    async fn test_trigger_stays_200_when_a_client_is_dead() {
        let state = test_state();
        let (tx, rx) = mpsc::unbounded_channel::<ws::Message>();
        state.dispatcher.register(Connection::duplex(tx));
        drop(rx);

        let (status, value) = get_json(define_routes(state.clone()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["success"], true);
        assert_eq!(value["broadcastedTo"]["total"], 0);
        // The dead client was pruned as part of the broadcast
        assert_eq!(state.dispatcher.client_counts().total, 0);
    }
}

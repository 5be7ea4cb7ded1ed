use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use relay::dispatcher::DeliveryReport;
use relay::message::EventKind;
use serde::Serialize;

/// Fixed informational payload fanned out on every trigger request.
pub(crate) const BROADCAST_PAYLOAD: &str = "Broadcast to client: REST Server received GET";

/// Per-transport delivery counts as exposed in the trigger response.
#[derive(Debug, Serialize)]
pub(crate) struct BroadcastCounts {
    websocket: usize,
    sse: usize,
    total: usize,
}

impl From<DeliveryReport> for BroadcastCounts {
    fn from(report: DeliveryReport) -> Self {
        Self {
            websocket: report.websocket,
            sse: report.sse,
            total: report.delivered,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerResponse {
    success: bool,
    message: &'static str,
    broadcasted_to: BroadcastCounts,
}

/// GET / (also mounted at /api): triggers one broadcast across all
/// registered connections.
///
/// Always responds 200 as long as the dispatcher runs; individual send
/// failures are consumed by the dispatcher as registry cleanup and only
/// show up as a lower delivered count.
pub(crate) async fn trigger(State(app_state): State<AppState>) -> impl IntoResponse {
    info!("REST Server received GET request");

    let report = app_state
        .dispatcher_ref()
        .broadcast(BROADCAST_PAYLOAD, EventKind::Broadcast);

    Json(TriggerResponse {
        success: true,
        message: "GET request processed successfully",
        broadcasted_to: report.into(),
    })
}

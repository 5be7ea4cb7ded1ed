use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use relay::connection::ClientCounts;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthCheckResponse {
    status: &'static str,
    timestamp: String,
    connected_clients: ClientCounts,
}

/// GET /health: liveness plus the number of clients currently connected
/// on each transport, taken from the registry at the instant of the call.
pub(crate) async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(HealthCheckResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        connected_clients: app_state.dispatcher_ref().client_counts(),
    })
}

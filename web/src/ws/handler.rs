use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use std::net::SocketAddr;

use crate::ws::actor;
use crate::AppState;

/// GET / on the duplex-channel listener.
/// Accepts the transport-level handshake and spawns an actor for the
/// connection. No authentication: any client that completes the
/// handshake is registered.
pub(crate) async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| actor::run_connection(socket, state, peer_addr))
}

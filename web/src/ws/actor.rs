use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use log::*;
use relay::connection::Connection;
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::AppState;

/// Literal welcome text sent on accept; not JSON-framed, unlike
/// broadcast frames on the push-stream transport.
const WELCOME_MESSAGE: &str = "Welcome to WebSocket server!";

/// Run the actor-per-connection pattern for an accepted WebSocket.
///
/// Splits the socket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages queued by broadcasts
/// - Reader loop: drains inbound frames until close or error
///
/// The mpsc sender registered with the dispatcher is the only way the
/// rest of the system reaches this client.
pub(crate) async fn run_connection(socket: WebSocket, state: AppState, peer_addr: SocketAddr) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Connection-accepted hook
    let connection_id = state.dispatcher.register(Connection::duplex(tx.clone()));

    let _ = tx.send(Message::Text(WELCOME_MESSAGE.to_string()));

    info!("New WebSocket connection from {peer_addr}");

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Reader loop: the relay has no business logic keyed on client-sent
    // content, so inbound frames are logged and discarded.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    debug!("Received WebSocket message from {peer_addr}: {text}");
                }
                Message::Binary(data) => {
                    debug!(
                        "Received {} bytes of binary WebSocket data from {peer_addr}",
                        data.len()
                    );
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Pong(_) => {}
                Message::Close(frame) => {
                    info!("WebSocket connection from {peer_addr} closed: {frame:?}");
                    break;
                }
            },
            Some(Err(e)) => {
                warn!("WebSocket error from {peer_addr}: {e}");
                break;
            }
            None => {
                info!("WebSocket stream from {peer_addr} ended");
                break;
            }
        }
    }

    // Connection-closed / connection-errored hook; idempotent with the
    // dispatcher's own pruning on a failed send.
    state.dispatcher.unregister(&connection_id);
    writer_handle.abort();
}

/// Writer task: receives queued messages and forwards them to the
/// WebSocket sink.
async fn writer_task(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // Socket is broken; the next broadcast prunes the registry entry
            break;
        }
    }
}

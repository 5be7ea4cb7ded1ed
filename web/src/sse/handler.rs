use crate::AppState;
use async_stream::stream;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use log::*;
use relay::connection::{Connection, ConnectionId};
use relay::message::{BroadcastMessage, EventKind};
use relay::Dispatcher;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unregisters the connection when the response stream is dropped.
/// Dropping is how Axum signals a client disconnect, so this is the
/// connection-closed lifecycle hook for the push-stream transport.
struct DisconnectGuard {
    dispatcher: Arc<Dispatcher>,
    connection_id: ConnectionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        debug!("SSE connection closed, cleaning up");
        self.dispatcher.unregister(&self.connection_id);
    }
}

/// SSE handler that establishes a long-lived push stream for broadcast
/// delivery. The connection is registered before this function returns,
/// with a `connection`-classified greeting frame already queued so it is
/// the first thing the client receives.
pub(crate) async fn sse_handler(
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Establishing SSE connection");

    let (tx, mut rx) = mpsc::unbounded_channel();

    // Queued ahead of registration, so no broadcast can outrun it.
    let greeting = BroadcastMessage::new("Connected to SSE stream", EventKind::Connection);
    let _ = tx.send(Ok(greeting.sse_event()));

    let connection_id = app_state.dispatcher.register(Connection::push_stream(tx));

    let guard = DisconnectGuard {
        dispatcher: app_state.dispatcher.clone(),
        connection_id,
    };

    // Events arrive from the registry's sender half; the registry holds
    // the only sender, so unregistering also ends this stream.
    let stream = stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            yield event;
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

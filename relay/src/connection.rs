use crate::error::{Error, Result};
use crate::message::BroadcastMessage;
use axum::extract::ws;
use axum::response::sse::Event;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::mpsc::UnboundedSender;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The two transport shapes a client can attach with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Persistent bidirectional WebSocket connection.
    Duplex,
    /// One-directional server-to-client SSE stream.
    PushStream,
}

/// Sender half of a connection's outbound channel, one variant per
/// transport shape. The receiving half lives with the transport task
/// that owns the socket or response stream and performs the actual I/O.
#[derive(Clone)]
enum ConnectionSender {
    Duplex(UnboundedSender<ws::Message>),
    PushStream(UnboundedSender<std::result::Result<Event, Infallible>>),
}

/// One live client attachment: identity plus the transport adapter that
/// knows how to format and queue a message for that client.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: ConnectionSender,
}

impl Connection {
    /// Wrap the outbound channel of a duplex (WebSocket) connection.
    pub fn duplex(sender: UnboundedSender<ws::Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender: ConnectionSender::Duplex(sender),
        }
    }

    /// Wrap the outbound channel of a push-stream (SSE) connection.
    pub fn push_stream(
        sender: UnboundedSender<std::result::Result<Event, Infallible>>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            sender: ConnectionSender::PushStream(sender),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn kind(&self) -> TransportKind {
        match self.sender {
            ConnectionSender::Duplex(_) => TransportKind::Duplex,
            ConnectionSender::PushStream(_) => TransportKind::PushStream,
        }
    }

    /// Queue one message for this client, formatted for its transport:
    /// plain broadcast text for a duplex connection, a classified event
    /// frame for a push stream.
    ///
    /// Fails with [`Error::SendFailed`] when the channel has closed. The
    /// channel state is checked at send time, not assumed, because a
    /// client-initiated close can race with an in-progress broadcast.
    pub fn send(&self, message: &BroadcastMessage) -> Result<()> {
        match &self.sender {
            ConnectionSender::Duplex(tx) => tx
                .send(ws::Message::Text(message.payload().to_string()))
                .map_err(|_| Error::SendFailed),
            ConnectionSender::PushStream(tx) => tx
                .send(Ok(message.sse_event()))
                .map_err(|_| Error::SendFailed),
        }
    }

    /// Idempotent close. A duplex connection is asked to close with a
    /// WebSocket Close frame; a push stream ends once the registry drops
    /// its sender, so there is no frame to write. Errors from an
    /// already-dead channel are ignored.
    pub fn close(&self) {
        if let ConnectionSender::Duplex(tx) = &self.sender {
            let _ = tx.send(ws::Message::Close(None));
        }
    }
}

/// Per-transport connection counts, shaped for the health and trigger
/// JSON responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientCounts {
    pub websocket: usize,
    pub sse: usize,
    pub total: usize,
}

/// Concurrency-safe registry of currently-live connections.
///
/// Invariant: at any instant the registry holds exactly the set of
/// connections able to receive a send. Entries are inserted on accept
/// and removed on close, error, or the first failed send, so no stale
/// entry survives past one delivery attempt.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection - O(1).
    ///
    /// Fails with [`Error::DuplicateIdentity`] if the identity already
    /// exists. Identities are generated server-side, so this is a
    /// defensive invariant check rather than a reachable error path.
    pub fn register(&self, connection: Connection) -> Result<()> {
        match self.connections.entry(connection.id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateIdentity(connection.id)),
            Entry::Vacant(entry) => {
                entry.insert(connection);
                Ok(())
            }
        }
    }

    /// Remove a connection if present - O(1). A no-op when the identity
    /// is absent: explicit close, the error callback, and a failed send
    /// can all race on the same connection.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);
    }

    /// Point-in-time copy of the registered connections, safe to iterate
    /// while register/unregister proceed against the live registry. No
    /// shard lock is held once the copy is taken, so a broadcast never
    /// stalls new connections from joining.
    pub fn snapshot(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Current size broken down by transport kind, for health reporting.
    pub fn client_counts(&self) -> ClientCounts {
        let mut counts = ClientCounts::default();
        for entry in self.connections.iter() {
            match entry.value().kind() {
                TransportKind::Duplex => counts.websocket += 1,
                TransportKind::PushStream => counts.sse += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn duplex_connection() -> (Connection, mpsc::UnboundedReceiver<ws::Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::duplex(tx), rx)
    }

    fn push_stream_connection() -> (
        Connection,
        mpsc::UnboundedReceiver<std::result::Result<Event, Infallible>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::push_stream(tx), rx)
    }

    #[test]
    fn test_register_and_count() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = duplex_connection();
        let (second, _rx2) = push_stream_connection();

        registry.register(first).unwrap();
        registry.register(second).unwrap();

        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_register_duplicate_identity_is_rejected() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = duplex_connection();
        let duplicate = connection.clone();

        registry.register(connection).unwrap();
        let err = registry.register(duplicate).unwrap_err();

        assert!(matches!(err, Error::DuplicateIdentity(_)));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = duplex_connection();
        let id = connection.id().clone();
        registry.register(connection).unwrap();

        registry.unregister(&id);
        assert_eq!(registry.count(), 0);

        // A second removal from a racing failure path never decrements twice.
        registry.unregister(&id);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_count_algebra_over_register_unregister_sequences() {
        let registry = ConnectionRegistry::new();
        let mut receivers = Vec::new();
        let mut ids = Vec::new();

        for _ in 0..5 {
            let (connection, rx) = duplex_connection();
            ids.push(connection.id().clone());
            receivers.push(rx);
            registry.register(connection).unwrap();
        }

        registry.unregister(&ids[0]);
        registry.unregister(&ids[3]);
        registry.unregister(&ids[0]); // already gone

        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn test_client_counts_split_by_transport() {
        let registry = ConnectionRegistry::new();
        let (ws1, _rx1) = duplex_connection();
        let (ws2, _rx2) = duplex_connection();
        let (sse1, _rx3) = push_stream_connection();

        registry.register(ws1).unwrap();
        registry.register(ws2).unwrap();
        registry.register(sse1).unwrap();

        let counts = registry.client_counts();
        assert_eq!(
            counts,
            ClientCounts {
                websocket: 2,
                sse: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_snapshot_is_a_point_in_time_copy() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = duplex_connection();
        let id = connection.id().clone();
        registry.register(connection).unwrap();

        let snapshot = registry.snapshot();
        registry.unregister(&id);

        // The copy is unaffected by mutation of the live registry.
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_send_fails_when_receiver_is_gone() {
        let (connection, rx) = duplex_connection();
        drop(rx);

        let message = BroadcastMessage::new("hello", crate::message::EventKind::Broadcast);
        assert_eq!(connection.send(&message), Err(Error::SendFailed));
    }

    #[tokio::test]
    async fn test_duplex_send_delivers_plain_text() {
        let (connection, mut rx) = duplex_connection();
        let message = BroadcastMessage::new("plain text", crate::message::EventKind::Broadcast);

        connection.send(&message).unwrap();

        match rx.recv().await.unwrap() {
            ws::Message::Text(text) => assert_eq!(text, "plain text"),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_queues_a_close_frame_and_is_idempotent() {
        let (connection, mut rx) = duplex_connection();

        connection.close();
        connection.close();

        assert!(matches!(rx.recv().await.unwrap(), ws::Message::Close(_)));
        assert!(matches!(rx.recv().await.unwrap(), ws::Message::Close(_)));
    }
}

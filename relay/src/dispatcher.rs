use crate::connection::{ClientCounts, Connection, ConnectionId, ConnectionRegistry, TransportKind};
use crate::message::{BroadcastMessage, EventKind};
use log::*;
use std::sync::Arc;

/// Outcome of one broadcast: how many connections the snapshot held and
/// how many sends were accepted, split by transport. Purely
/// informational; a failed delivery is permanently dropped for that
/// broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub total: usize,
    pub websocket: usize,
    pub sse: usize,
}

/// Fans one logical message out to every registered connection and owns
/// the lifecycle hooks the transport layer calls on accept and close.
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Connection-accepted hook. Returns the registered identity the
    /// transport handler later unregisters with.
    ///
    /// A duplicate identity cannot occur with generated ids; if it ever
    /// does it is a logic fault, logged and left unregistered rather
    /// than surfaced to the client.
    pub fn register(&self, connection: Connection) -> ConnectionId {
        let connection_id = connection.id().clone();
        let kind = connection.kind();
        if let Err(e) = self.registry.register(connection) {
            error!("Connection registration invariant violated: {e}");
            return connection_id;
        }
        match kind {
            TransportKind::Duplex => info!("Registered new WebSocket connection"),
            TransportKind::PushStream => info!("Registered new SSE connection"),
        }
        connection_id
    }

    /// Connection-closed / connection-errored hook. Safe to call from
    /// multiple failure paths racing on the same connection.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        debug!("Unregistering connection {}", connection_id.as_str());
        self.registry.unregister(connection_id);
    }

    /// Live connection counts for health reporting.
    pub fn client_counts(&self) -> ClientCounts {
        self.registry.client_counts()
    }

    /// Deliver one message to every registered connection, regardless of
    /// transport kind.
    ///
    /// Works over a registry snapshot: each send is a channel push, a
    /// failed send unregisters that connection and the loop continues.
    /// One dead or slow client never aborts delivery to the rest.
    pub fn broadcast(&self, payload: &str, kind: EventKind) -> DeliveryReport {
        let message = BroadcastMessage::new(payload, kind);
        let snapshot = self.registry.snapshot();

        let mut report = DeliveryReport {
            total: snapshot.len(),
            ..DeliveryReport::default()
        };

        for connection in snapshot {
            match connection.send(&message) {
                Ok(()) => {
                    report.delivered += 1;
                    match connection.kind() {
                        TransportKind::Duplex => report.websocket += 1,
                        TransportKind::PushStream => report.sse += 1,
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to send broadcast to connection {}: {e}. Connection will be cleaned up.",
                        connection.id().as_str()
                    );
                    self.registry.unregister(connection.id());
                }
            }
        }

        info!(
            "Broadcast delivered to {}/{} connections",
            report.delivered, report.total
        );
        report
    }

    /// Close every registered connection and empty the registry. Used at
    /// shutdown so long-lived streams end and the listeners can drain.
    pub fn close_all(&self) {
        for connection in self.registry.snapshot() {
            connection.close();
            self.registry.unregister(connection.id());
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

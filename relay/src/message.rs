use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;

/// Classification tag attached to every message that leaves the relay.
/// Appears as the `event:` line of a push-stream frame and as the `type`
/// field of its JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Fan-out triggered by the HTTP endpoint.
    Broadcast,
    /// Greeting frame sent when a push-stream client attaches.
    Connection,
    /// Direct message classification (reserved by the wire format).
    Message,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Broadcast => "broadcast",
            EventKind::Connection => "connection",
            EventKind::Message => "message",
        }
    }
}

/// Immutable broadcast value object. Created once per dispatch call and
/// dropped after delivery attempts complete; the timestamp is stamped at
/// construction time.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    payload: String,
    kind: EventKind,
    timestamp: DateTime<Utc>,
}

/// JSON body of a push-stream frame:
/// `{"type": ..., "message": ..., "timestamp": <ISO8601>}`.
#[derive(Serialize)]
struct EventFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a str,
    timestamp: String,
}

impl BroadcastMessage {
    pub fn new(payload: impl Into<String>, kind: EventKind) -> Self {
        Self {
            payload: payload.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Serialized JSON payload for the `data:` line of a frame.
    pub fn frame_json(&self) -> String {
        let frame = EventFrame {
            kind: self.kind.as_str(),
            message: &self.payload,
            timestamp: self.timestamp.to_rfc3339(),
        };
        match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize event frame: {e}");
                String::from("{}")
            }
        }
    }

    /// The message as a discrete push-stream event frame
    /// (`event: <classification>\ndata: <json>\n\n` on the wire).
    pub fn sse_event(&self) -> Event {
        Event::default().event(self.kind.as_str()).data(self.frame_json())
    }
}

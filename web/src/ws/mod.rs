//! Duplex-channel (WebSocket) endpoint, served on its own fixed port.

pub(crate) mod actor;
pub(crate) mod handler;

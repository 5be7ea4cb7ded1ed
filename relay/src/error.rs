//! Error types for the relay core.

use crate::connection::ConnectionId;
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by the registry and the transport send path.
///
/// `DuplicateIdentity` is a defensive invariant check: connection ids are
/// generated, never supplied by clients, so hitting it indicates a logic
/// fault rather than a user-facing condition. `SendFailed` is expected
/// and transient; the dispatcher consumes it by pruning the connection
/// and it is never surfaced to an HTTP caller.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    DuplicateIdentity(ConnectionId),
    SendFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DuplicateIdentity(id) => {
                write!(f, "connection {} is already registered", id.as_str())
            }
            Error::SendFailed => write!(f, "connection is no longer able to receive"),
        }
    }
}

impl StdError for Error {}

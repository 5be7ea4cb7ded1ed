//! HTTP and transport glue for the fan-out relay.
//!
//! Exposes two routers: the API router (trigger, health, SSE stream)
//! and the duplex-channel router served on its own fixed port. All
//! relay state lives in [`AppState`]; the handlers here only invoke the
//! dispatcher's lifecycle hooks and broadcast operation.

mod controller;
pub mod router;
mod sse;
mod ws;

pub use router::{define_duplex_routes, define_routes};

pub(crate) use service::AppState;

//! Push-stream (SSE) endpoint for the web layer.
//!
//! This module contains only the Axum handler. The registry, broadcast
//! dispatch, and event framing live in the `relay` crate.

pub(crate) mod handler;

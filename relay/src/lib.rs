//! Connection registry and broadcast dispatch for the fan-out relay.
//!
//! This crate is the stateful core of the relay: it tracks every live
//! client connection across both transport shapes and fans a single
//! logical message out to all of them.
//!
//! # Architecture
//!
//! - **Two transport shapes, one capability**: a duplex WebSocket
//!   connection and a one-directional SSE push stream are both wrapped
//!   behind the same send/close surface, so the dispatcher never branches
//!   on transport kind.
//! - **Registry of sender halves**: the registry stores only the mpsc
//!   sender half of each connection's outbound channel. The socket or
//!   response stream itself stays owned by its transport task in the web
//!   layer; removing a registry entry never tears transport resources
//!   down.
//! - **Copy-on-snapshot broadcast**: a broadcast iterates a point-in-time
//!   copy of the registry, so new connections can join while a broadcast
//!   is in flight and no lock is held across a send.
//! - **Self-healing registry**: a connection whose send fails is
//!   unregistered on the spot, not only when its close callback fires.
//!   Dead connections never survive past one failed send attempt.
//! - **At-most-once delivery**: a failed send is dropped for that
//!   broadcast. There is no retry, acknowledgment, or replay.
//!
//! # Message Flow
//!
//! 1. A transport handler accepts a client and registers a [`Connection`]
//!    holding the sender half of that client's outbound channel.
//! 2. The trigger endpoint calls [`Dispatcher::broadcast`].
//! 3. The dispatcher snapshots the registry and pushes one message into
//!    each connection's channel; the per-connection writer task performs
//!    the actual I/O, so one slow client cannot stall the loop.
//! 4. On disconnect, error, or failed send the connection is
//!    unregistered. Unregistration is idempotent because several failure
//!    paths can race on the same connection.
//!
//! # Modules
//!
//! - `connection`: `ConnectionRegistry`, `Connection` and the two
//!   transport sender variants
//! - `dispatcher`: broadcast fan-out and delivery accounting
//! - `message`: broadcast message value object and event classifications
//! - `error`: registry and send error types

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod message;

pub use dispatcher::Dispatcher;

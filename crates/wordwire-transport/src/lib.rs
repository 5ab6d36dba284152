//! Transport layer for Wordwire.
//!
//! Provides the point-to-point [`Connection`] over TCP, the per-kind
//! [`ResponseQueues`] it buffers into, and the [`HandlerRegistry`] used to
//! answer inbound requests. Everything here is role-agnostic plumbing: the
//! same connection type serves the client side of a session and each
//! server-accepted peer, differing only in which workers it runs.

mod connection;
mod error;
mod handler;
mod queues;

pub use connection::Connection;
pub use error::TransportError;
pub use handler::{Handler, HandlerError, HandlerRegistry};
pub use queues::ResponseQueues;

//! Client transport layer for retrokiosk.
//!
//! Provides the [`Connector`] and [`Connection`] traits the health monitor
//! drives. The controller never touches a socket type directly, which keeps
//! the monitor testable against in-memory fakes.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket client via `tokio-tungstenite`
//! - `tls` — adds `wss://` support

use std::fmt;
use std::future::Future;

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

/// Opaque identifier for a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outgoing connections.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Dials `url` and completes the opening handshake.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single open connection exchanging text frames.
pub trait Connection: Send + Sync + 'static {
    /// Sends one text frame.
    fn send(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next text frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

//! Transport abstraction layer for Agora.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the realtime channel to the backend. The concrete transport is swappable:
//! production uses WebSockets, tests use in-memory fakes.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket client transport via `tokio-tungstenite`


mod error;
mod reconnect;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use reconnect::ReconnectPolicy;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
///
/// A fresh ID is minted for every successful dial, so two dials to the same
/// hub produce distinct IDs. This is what lets callers observe whether a
/// registry handed back an existing connection or opened a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next unique `ConnectionId`.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a `ConnectionId` from a raw `u64`.
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

/// Lifecycle state of a hub connection's underlying transport.
///
/// ```text
/// Disconnected ──(dial)──→ Connecting ──→ Connected
///       ↑                                     │
///       └──(policy exhausted)── Reconnecting ←┘ (transport dropped)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No transport. Either never dialed, stopped, or reconnection gave up.
    Disconnected,
    /// First dial is in flight.
    Connecting,
    /// Transport is established; sends are possible.
    Connected,
    /// An established transport dropped; the reconnect policy is being walked.
    Reconnecting,
}

impl TransportState {
    /// Whether this state counts as "a connection exists or is on its way".
    ///
    /// A registry must not open a second transport for a hub in a live
    /// state — this predicate is the single-flight check.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::Reconnecting
        )
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Dials new outbound connections.
///
/// One connector serves every hub; the hub name selects the endpoint. The
/// access token is supplied per dial, not at construction, because
/// reconnect attempts must pick up the freshest token.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Conn: Connection;

    /// Dials the endpoint for `hub` once, authenticating with the given
    /// bearer token.
    ///
    /// The `Send` bound matters: connection tasks are `tokio::spawn`ed,
    /// so every future crossing this seam must be sendable.
    fn dial(
        &self,
        hub: &str,
        access_token: Option<&str>,
    ) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;
}

/// A single established connection that can send and receive frames.
pub trait Connection: Send + Sync + 'static {
    /// Sends a frame to the server.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the server.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_transport_state_is_live() {
        assert!(!TransportState::Disconnected.is_live());
        assert!(TransportState::Connecting.is_live());
        assert!(TransportState::Connected.is_live());
        assert!(TransportState::Reconnecting.is_live());
    }

    #[test]
    fn test_transport_state_display() {
        assert_eq!(TransportState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(TransportState::Connected.to_string(), "connected");
    }
}

//! Transport abstraction layer for flagquiz.
//!
//! Provides the [`Transport`] and [`Connection`] traits that the room engine
//! and connection handlers are written against, plus two implementations:
//!
//! - [`WebSocketTransport`] / [`WebSocketConnection`] — the real network
//!   transport, built on `tokio-tungstenite`.
//! - [`MemoryConnection`] / [`MemoryPeer`] — an in-process connection pair
//!   backed by channels, used to drive handlers without sockets.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryPeer};
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
///
/// Only used for logging. Rooms key their players by the `PlayerId`
/// assigned at join time, never by connection identity.
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

/// Accepts new incoming connections.
///
/// `accept` only takes the socket off the listener. Any protocol handshake
/// happens later in [`PendingConnection::upgrade`], on the connection's own
/// task, so a client that stalls mid-handshake never holds up the listener.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted socket that has not completed its handshake yet.
    type Pending: PendingConnection<Connection = Self::Connection>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming socket.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Pending, Self::Error>> + Send;
}

/// An accepted socket waiting for its handshake.
pub trait PendingConnection: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the handshake. Has no timeout of its own; callers bound it.
    fn upgrade(self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// The remote address, for logging.
    fn peer_addr(&self) -> std::net::SocketAddr;
}

/// A single duplex connection that can send and receive frames.
///
/// Connections are shared: the handler task reads from it while the room
/// holds the same connection (behind an `Arc`) to deliver broadcasts. The
/// send and receive halves must therefore not block each other.
///
/// Every method returns a `Send` future so handlers generic over the
/// connection type can still be `tokio::spawn`ed.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection. Closing twice is not an error worth
    /// surfacing; callers generally ignore the result.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

//! Persistent connections for Saberlink pose sync.
//!
//! A player keeps one WebSocket open for the whole session and exchanges
//! strictly alternating request/reply text frames over it. [`Listener`],
//! [`Incoming`] and [`Connection`] are the seams the server is written
//! against; the WebSocket types are the only implementation.

#![allow(async_fn_in_trait)]

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{WebSocketConnection, WebSocketIncoming, WebSocketListener};

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Process-unique tag for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws#{}", self.0)
    }
}

/// Hands out freshly accepted peers.
///
/// Accepting only completes the TCP handshake, so one slow or silent peer
/// can't hold up the peers behind it. The protocol upgrade happens in
/// [`Incoming::upgrade`], normally on the peer's own task.
pub trait Listener: Send + 'static {
    type Incoming: Incoming;

    async fn accept(&mut self) -> Result<Self::Incoming, TransportError>;

    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A peer that has connected but not yet completed the upgrade.
pub trait Incoming: Send + 'static {
    type Conn: Connection;

    fn peer_addr(&self) -> SocketAddr;

    /// Completes the upgrade, giving up after `timeout`.
    async fn upgrade(self, timeout: Duration) -> Result<Self::Conn, TransportError>;
}

/// One player's open connection.
pub trait Connection: Send + 'static {
    /// Next inbound payload, or `None` once the peer has closed.
    ///
    /// Text and binary frames both come back as raw bytes. Control frames
    /// are swallowed.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Writes one text frame.
    async fn send(&mut self, text: &str) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}

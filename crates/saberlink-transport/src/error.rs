use tokio_tungstenite::tungstenite;

/// Errors from the pose-sync listener and its connections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener couldn't bind or the TCP accept failed.
    #[error("listener: {0}")]
    Listener(#[from] std::io::Error),

    /// The peer connected but the WebSocket upgrade failed.
    #[error("handshake with {peer} failed: {source}")]
    Handshake {
        peer: std::net::SocketAddr,
        #[source]
        source: tungstenite::Error,
    },

    /// The peer connected but didn't finish the upgrade in time.
    #[error("handshake with {peer} timed out after {after:?}")]
    HandshakeTimeout {
        peer: std::net::SocketAddr,
        after: std::time::Duration,
    },

    /// Writing a frame failed; the peer is most likely gone.
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] tungstenite::Error),
}

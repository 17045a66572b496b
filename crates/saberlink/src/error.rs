//! Top-level error for starting and running the server.
//!
//! Per-message failures never surface here: the pose handler answers them
//! with `"KO"` and the HTTP boundary maps them to status codes.

use saberlink_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SaberlinkError {
    /// The pose listener or one of its connections failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The HTTP listener failed to bind or serve.
    #[error("http listener: {0}")]
    Http(#[from] std::io::Error),
}

//! Error types for the protocol layer.
//!
//! Each crate in Saberlink defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the shape of a message, not in
//! networking or authentication.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of a reply failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The inbound frame was not valid UTF-8.
    #[error("message is not valid UTF-8")]
    InvalidUtf8,

    /// A required key (`p` or `auth`) was absent or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A pose component or score was present but not a finite number.
    #[error("field `{key}` is not a number: {value:?}")]
    InvalidNumber {
        /// The message key that carried the bad value.
        key: &'static str,
        /// The value as received.
        value: String,
    },
}

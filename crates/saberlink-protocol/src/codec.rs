//! Codec trait and implementations for serializing replies.
//!
//! A "codec" turns reply structures into the text that goes on the wire.
//! The sync handler doesn't care HOW replies are serialized, only that
//! something implements [`Codec`]. Inbound messages have their own
//! fixed grammar (see [`PoseMessage`](crate::PoseMessage)) and don't go
//! through a codec.

use serde::Serialize;

use crate::ProtocolError;

/// Encodes outbound replies to text.
///
/// `Send + Sync + 'static` because one codec is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the value can't be represented in
    /// this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use saberlink_protocol::{Codec, JsonCodec, SyncReply};
///
/// let text = JsonCodec.encode(&SyncReply::ok(BTreeMap::new(), None)).unwrap();
/// assert_eq!(text, r#"{"status":"OK","others":{}}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}

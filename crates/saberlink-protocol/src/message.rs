//! Inbound pose messages.
//!
//! A client sends one message per update, e.g.
//!
//! ```text
//! p:alice,auth:tok123,score:450,c1x:1.2,c1y:0.5,c1z:-0.3,c2x:0,c2y:1,c2z:0
//! ```
//!
//! Schema:
//!
//! | key | meaning | required | default |
//! |-----|---------|----------|---------|
//! | `p` | username | yes | |
//! | `auth` | session token | yes | |
//! | `score` | current score | no | keep previous |
//! | `c1x` `c1y` `c1z` | left controller | no | `"0"` |
//! | `c2x` `c2y` `c2z` | right controller | no | `"0"` |
//!
//! Unknown keys, empty segments and segments without `:` are ignored.
//! If a key repeats, the last value wins.

use std::fmt;

use crate::ProtocolError;

/// Separator between `key:value` segments.
const SEGMENT_DELIMITER: char = ',';

/// Value a missing pose component takes.
pub const DEFAULT_COMPONENT: &str = "0";

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// One controller position.
///
/// Components are kept as the client's original numeric text so they are
/// echoed to other players exactly as sent. Parsing guarantees each one
/// is a finite number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pose {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            x: DEFAULT_COMPONENT.to_string(),
            y: DEFAULT_COMPONENT.to_string(),
            z: DEFAULT_COMPONENT.to_string(),
        }
    }
}

/// Renders as `x,y,z`, the form other players receive.
impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// PoseMessage
// ---------------------------------------------------------------------------

/// A parsed, schema-checked pose update.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseMessage {
    /// Claimed username (`p`). Not yet authenticated.
    pub username: String,
    /// Token presented with the claim (`auth`).
    pub auth: String,
    /// Reported score, if the message carried one.
    pub score: Option<f64>,
    /// Left controller (`c1*`). Missing components are `"0"`.
    pub left: Pose,
    /// Right controller (`c2*`). Missing components are `"0"`.
    pub right: Pose,
}

impl PoseMessage {
    /// Parses a raw frame.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidUtf8`] if the bytes aren't UTF-8, otherwise
    /// whatever [`parse`](Self::parse) returns.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let text =
            std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::parse(text)
    }

    /// Parses a `key:value,key:value` message.
    ///
    /// # Errors
    /// - [`ProtocolError::MissingField`]: `p` or `auth` absent or empty
    /// - [`ProtocolError::InvalidNumber`]: a pose component or the score
    ///   isn't a finite number
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut username = None;
        let mut auth = None;
        let mut score = None;
        let mut left = Pose::default();
        let mut right = Pose::default();

        for segment in text.split(SEGMENT_DELIMITER) {
            let Some((key, value)) = segment.trim().split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "p" => username = Some(value.to_string()),
                "auth" => auth = Some(value.to_string()),
                "score" => score = Some(parse_number("score", value)?),
                "c1x" => left.x = component("c1x", value)?,
                "c1y" => left.y = component("c1y", value)?,
                "c1z" => left.z = component("c1z", value)?,
                "c2x" => right.x = component("c2x", value)?,
                "c2y" => right.y = component("c2y", value)?,
                "c2z" => right.z = component("c2z", value)?,
                _ => {}
            }
        }

        let username = username
            .filter(|u| !u.is_empty())
            .ok_or(ProtocolError::MissingField("p"))?;
        let auth = auth
            .filter(|a| !a.is_empty())
            .ok_or(ProtocolError::MissingField("auth"))?;

        Ok(Self {
            username,
            auth,
            score,
            left,
            right,
        })
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<f64, ProtocolError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ProtocolError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}

fn component(key: &'static str, value: &str) -> Result<String, ProtocolError> {
    parse_number(key, value)?;
    Ok(value.to_string())
}

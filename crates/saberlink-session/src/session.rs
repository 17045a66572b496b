//! Session types: the data structures that represent a signed-in player.
//!
//! A "session" is the server's record of one player. It tracks:
//! - WHO the player is (`username`) and how they prove it (the token)
//! - WHERE their controllers are (`left`, `right`) and their `score`
//! - WHICH level they picked, if any
//! - WHEN they were last heard from, and whether they've synced yet

use std::time::Duration;

use saberlink_protocol::{Pose, PlayerView};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing for pending-session expiry.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a pending session may stay silent before it is evicted.
    ///
    /// Default: 120 seconds.
    pub idle_timeout: Duration,

    /// How often the reaper scans for idle pending sessions.
    ///
    /// Default: 10 seconds.
    pub reap_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(120),
            reap_interval: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// ChosenLevel
// ---------------------------------------------------------------------------

/// A level resolved from the map catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChosenLevel {
    /// Download URL. Consensus groups players by this value.
    pub url: String,
    /// Cover art URL.
    pub cover_url: String,
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// One signed-in player.
///
/// The registry only ever hands out shared references, so the fields are
/// read-only outside this crate. The token is private: it is set at
/// sign-in and never changes for the life of the record.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// Registry key. Unique and immutable.
    pub username: String,

    auth_token: String,

    /// Left controller, `0,0,0` until the first pose message.
    pub left: Pose,

    /// Right controller, `0,0,0` until the first pose message.
    pub right: Pose,

    /// Last reported score.
    pub score: f64,

    /// Level picked through the HTTP boundary.
    pub chosen_level: Option<ChosenLevel>,

    /// Last sign-in or authenticated pose message.
    pub last_seen: Instant,

    /// `true` until the first authenticated pose update. Only pending
    /// sessions can expire.
    pub pending: bool,
}

impl PlayerSession {
    pub(crate) fn new(username: &str, auth_token: &str, now: Instant) -> Self {
        Self {
            username: username.to_string(),
            auth_token: auth_token.to_string(),
            left: Pose::default(),
            right: Pose::default(),
            score: 0.0,
            chosen_level: None,
            last_seen: now,
            pending: true,
        }
    }

    /// Whether `token` is this session's token.
    pub fn token_matches(&self, token: &str) -> bool {
        self.auth_token == token
    }

    /// How this player appears in someone else's snapshot.
    pub fn view(&self) -> PlayerView {
        let (map_url, cover_url) = match &self.chosen_level {
            Some(level) => (level.url.clone(), level.cover_url.clone()),
            None => (String::new(), String::new()),
        };
        PlayerView {
            left_controller: self.left.to_string(),
            right_controller: self.right.to_string(),
            map_url,
            cover_url,
        }
    }

    /// Whether this pending session has been silent longer than `timeout`.
    pub fn is_idle_pending(&self, now: Instant, timeout: Duration) -> bool {
        self.pending && now.saturating_duration_since(self.last_seen) > timeout
    }
}

//! The session registry: one keyed table of every signed-in player.
//!
//! Responsibilities:
//! - Creating or refreshing sessions at sign-in ([`upsert`](SessionRegistry::upsert))
//! - Applying authenticated pose updates
//! - Recording level choices from the HTTP boundary
//! - Re-arming sessions whose connection closed
//! - Evicting pending sessions that went silent
//!
//! Every method takes `now` explicitly instead of reading the clock, so
//! callers decide what "now" means and tests can step through time.

use std::collections::BTreeMap;
use std::time::Duration;

use saberlink_protocol::{PlayerView, PoseMessage};
use tokio::time::Instant;

use crate::{AuthGate, ChosenLevel, PlayerSession, SessionError};

/// All sessions, keyed by username.
///
/// A `BTreeMap` rather than a `HashMap` so iteration order is the
/// username order. Snapshots, consensus tie-breaks and expiry reports are
/// therefore reproducible.
///
/// ## Lifecycle
///
/// ```text
/// upsert() ──→ [pending] ──apply_pose()──→ [active]
///                  │
///                  ▼
///       expire_idle_pending()
///                  │
///                  ▼
///              (removed)
/// ```
///
/// Active sessions stay until the process exits or the username signs in
/// again.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, PlayerSession>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs a player in.
    ///
    /// - Unknown username: a new pending session is created.
    /// - Known username, same token: the existing record is kept, re-marked
    ///   pending and its `last_seen` refreshed. Pose, score and level stay.
    /// - Known username, different token: the old record is destroyed and
    ///   a fresh pending one takes its place. This is the only way a
    ///   session's token ever changes.
    ///
    /// The registry never holds more than one entry per username.
    pub fn upsert(
        &mut self,
        username: &str,
        token: &str,
        now: Instant,
    ) -> &PlayerSession {
        self.sessions
            .entry(username.to_string())
            .and_modify(|existing| {
                if existing.token_matches(token) {
                    existing.pending = true;
                    existing.last_seen = now;
                    tracing::info!(username, "session refreshed");
                } else {
                    *existing = PlayerSession::new(username, token, now);
                    tracing::info!(username, "session replaced (new token)");
                }
            })
            .or_insert_with(|| {
                tracing::info!(username, "session created");
                PlayerSession::new(username, token, now)
            })
    }

    /// Looks up a session by username.
    pub fn get(&self, username: &str) -> Option<&PlayerSession> {
        self.sessions.get(username)
    }

    /// Removes a session outright. Returns the removed record, if any.
    pub fn remove(&mut self, username: &str) -> Option<PlayerSession> {
        self.sessions.remove(username)
    }

    /// Iterates over every session in username order.
    pub fn all(&self) -> impl Iterator<Item = &PlayerSession> {
        self.sessions.values()
    }

    /// Applies an authenticated pose update.
    ///
    /// Both controllers are replaced wholesale: components the message
    /// didn't carry are already `"0"` in `msg`, not the previous values.
    /// `score` is only overwritten when the message has one. The session
    /// stops being pending and its `last_seen` moves to `now`.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if `msg`'s username/token don't match.
    pub fn apply_pose(
        &mut self,
        msg: &PoseMessage,
        now: Instant,
    ) -> Result<&PlayerSession, SessionError> {
        self.authenticate(&msg.username, &msg.auth)?;
        let session = self
            .sessions
            .get_mut(&msg.username)
            .ok_or_else(|| SessionError::NotFound(msg.username.clone()))?;

        session.left = msg.left.clone();
        session.right = msg.right.clone();
        if let Some(score) = msg.score {
            session.score = score;
        }
        session.last_seen = now;
        session.pending = false;
        Ok(session)
    }

    /// Records the level a player picked.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the pair doesn't match.
    pub fn set_chosen_level(
        &mut self,
        username: &str,
        token: &str,
        level: ChosenLevel,
    ) -> Result<(), SessionError> {
        self.authenticate(username, token)?;
        let session = self
            .sessions
            .get_mut(username)
            .ok_or_else(|| SessionError::NotFound(username.to_string()))?;
        tracing::info!(username, url = %level.url, "level chosen");
        session.chosen_level = Some(level);
        Ok(())
    }

    /// What `username` sees: every other player's view.
    pub fn snapshot_excluding(
        &self,
        username: &str,
    ) -> BTreeMap<String, PlayerView> {
        self.sessions
            .iter()
            .filter(|(name, _)| name.as_str() != username)
            .map(|(name, session)| (name.clone(), session.view()))
            .collect()
    }

    /// Removes every pending session silent for longer than `timeout`.
    ///
    /// Active (non-pending) sessions are never touched, however stale.
    /// Returns the evicted usernames in username order.
    pub fn expire_idle_pending(
        &mut self,
        now: Instant,
        timeout: Duration,
    ) -> Vec<String> {
        let mut expired = Vec::new();
        self.sessions.retain(|name, session| {
            if session.is_idle_pending(now, timeout) {
                expired.push(name.clone());
                false
            } else {
                true
            }
        });
        for username in &expired {
            tracing::info!(%username, "pending session expired");
        }
        expired
    }

    /// Returns the number of sessions (pending or active).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`. Time is driven by
    //! passing explicit instants, never by sleeping.

    use saberlink_protocol::Pose;

    use super::*;

    const IDLE: Duration = Duration::from_secs(120);

    fn pose_msg(text: &str) -> PoseMessage {
        PoseMessage::parse(text).expect("valid test message")
    }

    fn level(url: &str) -> ChosenLevel {
        ChosenLevel {
            url: url.to_string(),
            cover_url: format!("{url}/cover.jpg"),
        }
    }

    // =====================================================================
    // upsert()
    // =====================================================================

    #[test]
    fn test_upsert_new_player_creates_pending_session() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();

        let s = reg.upsert("alice", "tok1", now);

        assert_eq!(s.username, "alice");
        assert!(s.pending);
        assert_eq!(s.last_seen, now);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_upsert_same_token_is_idempotent() {
        let mut reg = SessionRegistry::new();
        let t0 = Instant::now();
        reg.upsert("alice", "tok1", t0);

        let t1 = t0 + Duration::from_secs(5);
        let s = reg.upsert("alice", "tok1", t1);

        assert_eq!(s.last_seen, t1, "last_seen should be refreshed");
        assert_eq!(reg.len(), 1, "no duplicate entry");
    }

    #[test]
    fn test_upsert_same_token_keeps_pose_and_level() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        reg.upsert("alice", "tok1", now);
        reg.apply_pose(&pose_msg("p:alice,auth:tok1,c1x:4"), now).unwrap();
        reg.set_chosen_level("alice", "tok1", level("U")).unwrap();

        let s = reg.upsert("alice", "tok1", now);

        assert!(s.pending, "sign-in re-marks the session pending");
        assert_eq!(s.left.x, "4");
        assert_eq!(s.chosen_level, Some(level("U")));
    }

    #[test]
    fn test_upsert_new_token_replaces_session() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        reg.upsert("alice", "tok1", now);
        reg.apply_pose(&pose_msg("p:alice,auth:tok1,c1x:4"), now).unwrap();

        let s = reg.upsert("alice", "tok2", now);

        assert!(s.token_matches("tok2"));
        assert!(!s.token_matches("tok1"));
        assert_eq!(s.left, Pose::default(), "fresh record");
        assert_eq!(reg.len(), 1);
    }

    // =====================================================================
    // apply_pose()
    // =====================================================================

    #[test]
    fn test_apply_pose_clears_pending_and_stamps_time() {
        let mut reg = SessionRegistry::new();
        let t0 = Instant::now();
        reg.upsert("alice", "tok1", t0);

        let t1 = t0 + Duration::from_secs(3);
        let s = reg
            .apply_pose(&pose_msg("p:alice,auth:tok1,c1x:1,c1y:2,c1z:3"), t1)
            .unwrap();

        assert!(!s.pending);
        assert_eq!(s.last_seen, t1);
        assert_eq!(s.left.to_string(), "1,2,3");
        assert_eq!(s.right.to_string(), "0,0,0");
    }

    #[test]
    fn test_apply_pose_replaces_rather_than_merges() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        reg.upsert("alice", "tok1", now);
        reg.apply_pose(&pose_msg("p:alice,auth:tok1,c1x:1,c1y:2,c1z:3"), now)
            .unwrap();

        let s = reg
            .apply_pose(&pose_msg("p:alice,auth:tok1,c1y:9"), now)
            .unwrap();

        assert_eq!(s.left.to_string(), "0,9,0");
    }

    #[test]
    fn test_apply_pose_score_only_overwritten_when_present() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        reg.upsert("alice", "tok1", now);
        reg.apply_pose(&pose_msg("p:alice,auth:tok1,score:450"), now).unwrap();

        let s = reg.apply_pose(&pose_msg("p:alice,auth:tok1"), now).unwrap();

        assert_eq!(s.score, 450.0);
    }

    #[test]
    fn test_apply_pose_wrong_token_leaves_state_unchanged() {
        let mut reg = SessionRegistry::new();
        let t0 = Instant::now();
        reg.upsert("alice", "tok1", t0);

        let result = reg.apply_pose(
            &pose_msg("p:alice,auth:nope,c1x:5"),
            t0 + Duration::from_secs(1),
        );

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
        let s = reg.get("alice").unwrap();
        assert!(s.pending);
        assert_eq!(s.last_seen, t0);
        assert_eq!(s.left, Pose::default());
    }

    #[test]
    fn test_apply_pose_unknown_player_fails_auth() {
        let mut reg = SessionRegistry::new();

        let result = reg.apply_pose(&pose_msg("p:ghost,auth:x"), Instant::now());

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
        assert!(reg.is_empty());
    }

    // =====================================================================
    // set_chosen_level()
    // =====================================================================

    #[test]
    fn test_set_chosen_level_requires_matching_token() {
        let mut reg = SessionRegistry::new();
        reg.upsert("alice", "tok1", Instant::now());

        let result = reg.set_chosen_level("alice", "bad", level("U"));

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
        assert!(reg.get("alice").unwrap().chosen_level.is_none());
    }

    // =====================================================================
    // snapshot_excluding()
    // =====================================================================

    #[test]
    fn test_snapshot_excluding_omits_requester() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        reg.upsert("alice", "a", now);
        reg.upsert("bob", "b", now);
        reg.upsert("carol", "c", now);

        let snap = reg.snapshot_excluding("bob");

        let names: Vec<_> = snap.keys().cloned().collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    // =====================================================================
    // expire_idle_pending()
    // =====================================================================

    #[test]
    fn test_expire_idle_pending_respects_threshold() {
        let mut reg = SessionRegistry::new();
        let t0 = Instant::now();
        reg.upsert("alice", "tok1", t0);

        let before = reg.expire_idle_pending(t0 + Duration::from_secs(119), IDLE);
        assert!(before.is_empty());
        assert!(reg.get("alice").is_some(), "present just before threshold");

        let at = reg.expire_idle_pending(t0 + IDLE, IDLE);
        assert!(at.is_empty(), "exactly at the threshold is not exceeded");

        let after = reg.expire_idle_pending(t0 + Duration::from_secs(121), IDLE);
        assert_eq!(after, vec!["alice".to_string()]);
        assert!(reg.get("alice").is_none(), "absent just after threshold");
    }

    #[test]
    fn test_expire_idle_pending_never_touches_active_sessions() {
        let mut reg = SessionRegistry::new();
        let t0 = Instant::now();
        reg.upsert("alice", "tok1", t0);
        reg.upsert("bob", "tok2", t0);
        reg.apply_pose(&pose_msg("p:alice,auth:tok1"), t0).unwrap();

        let expired =
            reg.expire_idle_pending(t0 + Duration::from_secs(86_400), IDLE);

        assert_eq!(expired, vec!["bob".to_string()]);
        assert!(reg.get("alice").is_some());
    }

    #[test]
    fn test_expire_idle_pending_drops_level_choice_with_session() {
        let mut reg = SessionRegistry::new();
        let t0 = Instant::now();
        reg.upsert("alice", "tok1", t0);
        reg.set_chosen_level("alice", "tok1", level("U")).unwrap();

        reg.expire_idle_pending(t0 + Duration::from_secs(200), IDLE);

        assert!(reg.is_empty());
        assert_eq!(crate::majority_level_cover(reg.all()), None);
    }

    // =====================================================================
    // get() / remove() / all()
    // =====================================================================

    #[test]
    fn test_remove_then_get_returns_none() {
        let mut reg = SessionRegistry::new();
        reg.upsert("alice", "tok1", Instant::now());

        let removed = reg.remove("alice");

        assert_eq!(removed.map(|s| s.username), Some("alice".to_string()));
        assert!(reg.get("alice").is_none());
        assert!(reg.remove("alice").is_none());
    }

    #[test]
    fn test_all_iterates_in_username_order() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        reg.upsert("carol", "c", now);
        reg.upsert("alice", "a", now);
        reg.upsert("bob", "b", now);

        let names: Vec<_> = reg.all().map(|s| s.username.as_str()).collect();

        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }
}

//! Authentication of `(username, token)` pairs.
//!
//! Tokens are minted client-side and registered at sign-in; after that
//! every pose message and level selection must present the same token.
//! The check is a lookup plus an equality test, with no side effects.
//!
//! [`AuthGate`] is a trait so the server code is written against "something
//! that can authenticate" rather than the registry's concrete type, the
//! same seam where an external identity provider would plug in.

use crate::{PlayerSession, SessionError, SessionRegistry};

/// Validates a player's claimed identity.
pub trait AuthGate {
    /// Returns the session for `username` if `token` is its token.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] when the username is unknown or the
    /// token doesn't match. The two cases are deliberately the same error.
    fn authenticate(
        &self,
        username: &str,
        token: &str,
    ) -> Result<&PlayerSession, SessionError>;
}

impl AuthGate for SessionRegistry {
    fn authenticate(
        &self,
        username: &str,
        token: &str,
    ) -> Result<&PlayerSession, SessionError> {
        self.get(username)
            .filter(|session| session.token_matches(token))
            .ok_or_else(|| SessionError::AuthFailed(username.to_string()))
    }
}

//! Error types for the session layer.

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The `(username, token)` pair didn't match a registered session.
    ///
    /// Covers both an unknown username and a wrong token; callers answer
    /// both the same way so the reply doesn't reveal which usernames exist.
    #[error("authentication failed for {0}")]
    AuthFailed(String),

    /// No session exists for the given username.
    #[error("session not found for {0}")]
    NotFound(String),
}

//! Player session management for Saberlink.
//!
//! This crate owns the server's only real state:
//!
//! 1. **Session tracking**: one [`PlayerSession`] per signed-in username,
//!    held in the [`SessionRegistry`]
//! 2. **Authentication**: checking a `(username, token)` pair against
//!    the registry ([`AuthGate`])
//! 3. **Level consensus**: which chosen level, if any, a strict majority
//!    of players agree on ([`majority_level_cover`])
//! 4. **Expiry**: evicting players who signed in but never synced
//!    ([`SessionRegistry::expire_idle_pending`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← sync handler, reaper task, HTTP sign-in
//!     ↕
//! Session Layer (this crate)  ← player records behind one lock
//!     ↕
//! Protocol Layer (below)  ← Pose, PoseMessage, PlayerView
//! ```
//!
//! # Concurrency
//!
//! Nothing here is thread-safe on its own. The server wraps the registry
//! in a single `tokio::sync::Mutex`; every mutation and every
//! snapshot/consensus read happens under that lock, so no reader ever
//! sees a half-updated session.

mod auth;
mod consensus;
mod error;
mod registry;
mod session;

pub use auth::AuthGate;
pub use consensus::majority_level_cover;
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{ChosenLevel, PlayerSession, SessionConfig};

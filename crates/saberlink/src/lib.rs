//! # Saberlink
//!
//! Real-time sync server for multiplayer rhythm-game sessions.
//!
//! Players sign in over HTTP, pick a level from the map catalog, then
//! stream controller poses over a persistent WebSocket. Every pose message
//! is answered with the latest state of everyone else plus the level a
//! strict majority has picked, if any. Players who sign in but never sync
//! are evicted by a background reaper.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use saberlink::prelude::*;
//!
//! # async fn start() -> Result<(), SaberlinkError> {
//! let catalog = BeatSaverCatalog::new(reqwest::Client::new(), DEFAULT_CATALOG_URL);
//! let server = SaberlinkServerBuilder::new()
//!     .ws_bind("0.0.0.0:8080")
//!     .http_bind("0.0.0.0:8081")
//!     .build(catalog)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod api;
mod catalog;
mod config;
mod error;
mod handler;
mod reaper;
mod server;

pub use catalog::{BeatSaverCatalog, CatalogError, DEFAULT_CATALOG_URL, MapCatalog};
pub use config::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_HTTP_BIND, DEFAULT_WS_BIND, ServerConfig};
pub use error::SaberlinkError;
pub use reaper::ExpiryReaper;
pub use server::{SaberlinkServer, SaberlinkServerBuilder};

pub mod prelude {
    pub use crate::{
        BeatSaverCatalog, CatalogError, DEFAULT_CATALOG_URL, ExpiryReaper, MapCatalog,
        SaberlinkError, SaberlinkServer, SaberlinkServerBuilder, ServerConfig,
    };
    pub use saberlink_protocol::{Pose, PoseMessage, SyncReply};
    pub use saberlink_session::{
        AuthGate, ChosenLevel, PlayerSession, SessionConfig, SessionError, SessionRegistry,
    };
}

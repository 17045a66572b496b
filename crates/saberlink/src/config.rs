//! Server configuration.
//!
//! Both listeners and every timing value are configurable; the defaults
//! below only apply when the operator doesn't say otherwise. The binary
//! fills this in from CLI flags and `SABERLINK_*` environment variables.

use std::time::Duration;

use saberlink_session::SessionConfig;

use crate::catalog::DEFAULT_CATALOG_URL;

/// Default address for the persistent pose-sync connections.
pub const DEFAULT_WS_BIND: &str = "127.0.0.1:8080";

/// Default address for the sign-in / level-selection HTTP endpoints.
pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8081";

/// Default time a new peer gets to complete the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where the WebSocket pose-sync listener binds.
    pub ws_bind: String,
    /// Where the HTTP boundary binds.
    pub http_bind: String,
    /// How long a new pose peer may take to finish the upgrade.
    pub handshake_timeout: Duration,
    /// Base URL of the map catalog.
    pub catalog_url: String,
    /// Pending-session expiry timing.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_bind: DEFAULT_WS_BIND.to_string(),
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            session: SessionConfig::default(),
        }
    }
}

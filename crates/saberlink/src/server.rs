//! `SaberlinkServer` builder and server loop.
//!
//! This is the entry point for running a Saberlink sync server. It ties
//! together the two listeners and the background reaper, all sharing one
//! session registry:
//!
//! ```text
//! HTTP  (/signin, /selectlevel) ──┐
//! WS    (pose sync, 1 task/conn) ──┼──▶ Mutex<SessionRegistry>
//! ExpiryReaper (every 10s)      ──┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use saberlink_protocol::JsonCodec;
use saberlink_session::{SessionConfig, SessionRegistry};
use saberlink_transport::{Incoming, Listener, WebSocketListener};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::api;
use crate::catalog::MapCatalog;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::reaper::ExpiryReaper;
use crate::SaberlinkError;

/// Shared server state passed to each connection task and HTTP handler.
///
/// The registry sits behind a single async `Mutex`: every mutation and
/// every snapshot/consensus read goes through it.
pub(crate) struct ServerState<M: MapCatalog> {
    pub(crate) registry: Arc<Mutex<SessionRegistry>>,
    pub(crate) codec: JsonCodec,
    pub(crate) catalog: M,
    pub(crate) session_config: SessionConfig,
}

impl<M: MapCatalog> ServerState<M> {
    pub(crate) fn new(catalog: M, session_config: SessionConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
            codec: JsonCodec,
            catalog,
            session_config,
        }
    }
}

/// Builder for configuring and starting a Saberlink server.
///
/// # Example
///
/// ```rust,ignore
/// use saberlink::prelude::*;
///
/// let server = SaberlinkServerBuilder::new()
///     .ws_bind("0.0.0.0:8080")
///     .http_bind("0.0.0.0:8081")
///     .build(BeatSaverCatalog::new(reqwest::Client::new(), DEFAULT_CATALOG_URL))
///     .await?;
/// server.run().await
/// ```
pub struct SaberlinkServerBuilder {
    config: ServerConfig,
}

impl SaberlinkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address for persistent pose-sync connections.
    pub fn ws_bind(mut self, addr: &str) -> Self {
        self.config.ws_bind = addr.to_string();
        self
    }

    /// Sets the address for the HTTP endpoints.
    pub fn http_bind(mut self, addr: &str) -> Self {
        self.config.http_bind = addr.to_string();
        self
    }

    /// Sets how long a new peer gets to finish the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the pending-session expiry timing.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Binds both listeners. Nothing is served until
    /// [`run`](SaberlinkServer::run) is called.
    pub async fn build<M: MapCatalog>(
        self,
        catalog: M,
    ) -> Result<SaberlinkServer<M>, SaberlinkError> {
        let listener = WebSocketListener::bind(self.config.ws_bind.as_str()).await?;
        let http = TcpListener::bind(self.config.http_bind.as_str()).await?;
        tracing::info!(addr = %self.config.http_bind, "HTTP listener bound");

        let state = Arc::new(ServerState::new(catalog, self.config.session));

        Ok(SaberlinkServer {
            listener,
            http,
            handshake_timeout: self.config.handshake_timeout,
            state,
        })
    }
}

impl Default for SaberlinkServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Saberlink server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct SaberlinkServer<M: MapCatalog> {
    listener: WebSocketListener,
    http: TcpListener,
    handshake_timeout: Duration,
    state: Arc<ServerState<M>>,
}

impl<M: MapCatalog> SaberlinkServer<M> {
    /// Address of the pose-sync listener.
    pub fn ws_local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Address of the HTTP listener.
    pub fn http_local_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// Handle on the shared registry, e.g. for inspection.
    pub fn registry(&self) -> Arc<Mutex<SessionRegistry>> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the server.
    ///
    /// Starts the expiry reaper and the HTTP endpoints on their own tasks,
    /// then accepts pose connections. Each peer's upgrade and message loop
    /// run on its own task, so a stalled handshake only stalls itself.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), SaberlinkError> {
        tracing::info!("Saberlink server running");

        ExpiryReaper::new(
            Arc::clone(&self.state.registry),
            self.state.session_config.clone(),
        )
        .spawn();

        let router = api::router(Arc::clone(&self.state));
        let http = self.http;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(http, router).await {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        });

        loop {
            match self.listener.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    let timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        let peer = incoming.peer_addr();
                        let conn = match incoming.upgrade(timeout).await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::warn!(%peer, error = %e, "pose handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

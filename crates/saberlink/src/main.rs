use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use saberlink::prelude::*;
use saberlink::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_HTTP_BIND, DEFAULT_WS_BIND};
use tracing_subscriber::EnvFilter;

/// Pose and level sync server.
#[derive(Debug, Parser)]
#[command(name = "saberlink", version, about)]
struct Cli {
    /// Address for persistent pose-sync WebSocket connections.
    #[arg(long, env = "SABERLINK_WS_BIND", default_value = DEFAULT_WS_BIND)]
    ws_bind: String,

    /// Address for the sign-in and level-selection endpoints.
    #[arg(long, env = "SABERLINK_HTTP_BIND", default_value = DEFAULT_HTTP_BIND)]
    http_bind: String,

    /// Base URL of the BeatSaver-compatible map catalog.
    #[arg(long, env = "SABERLINK_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    catalog_url: String,

    /// Seconds a new pose peer gets to finish the WebSocket upgrade.
    #[arg(long, env = "SABERLINK_HANDSHAKE_TIMEOUT_SECS", default_value_t = DEFAULT_HANDSHAKE_TIMEOUT.as_secs())]
    handshake_timeout_secs: u64,

    /// Seconds a pending session may stay silent before eviction.
    #[arg(long, env = "SABERLINK_IDLE_TIMEOUT_SECS", default_value_t = 120)]
    idle_timeout_secs: u64,

    /// Seconds between reaper sweeps. 0 disables the reaper.
    #[arg(long, env = "SABERLINK_REAP_INTERVAL_SECS", default_value_t = 10)]
    reap_interval_secs: u64,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            ws_bind: self.ws_bind,
            http_bind: self.http_bind,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            catalog_url: self.catalog_url,
            session: SessionConfig {
                idle_timeout: Duration::from_secs(self.idle_timeout_secs),
                reap_interval: Duration::from_secs(self.reap_interval_secs),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();

    let client = reqwest::Client::builder()
        .user_agent(concat!("saberlink/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(10))
        .build()
        .context("building catalog HTTP client")?;
    let catalog = BeatSaverCatalog::new(client, config.catalog_url.clone());

    let server = SaberlinkServerBuilder::new()
        .config(config)
        .build(catalog)
        .await
        .context("binding listeners")?;

    tracing::info!(
        ws = %server.ws_local_addr()?,
        http = %server.http_local_addr()?,
        "listening"
    );

    tokio::select! {
        result = server.run() => result.context("server stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

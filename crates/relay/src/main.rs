//! image-relay entry point.
//!
//! Serves the same-origin image relay over HTTP. Logs are JSON on stderr.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use giftlist_core::AppConfig;
use giftlist_relay::{PROXY_PATH, RelayState, router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let state = RelayState::from_config(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.relay_bind)
        .await
        .with_context(|| format!("failed to bind {}", config.relay_bind))?;

    tracing::info!(addr = %config.relay_bind, path = PROXY_PATH, "Starting image relay");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

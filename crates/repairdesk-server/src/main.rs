//! # repairdesk-server
//!
//! HTTP backend for the device-repair intake form.
//!
//! This binary provides:
//! - **Open and key-gated submission endpoints** that validate a repair
//!   request, store its optional image and append it to the record store
//! - **Read endpoints** returning every stored submission as JSON or as an
//!   HTML table
//! - **Static access** to uploaded images under `/uploads/`

mod api;
mod attachments;
mod config;
mod error;
mod view;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,repairdesk_server=debug")),
        )
        .init();

    info!("Starting repair desk server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.uses_default_api_key() {
        warn!("API_KEY not set, /submit-with-apikey accepts the development default");
    }

    // -----------------------------------------------------------------------
    // 3. Open the record and attachment stores
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let app_state = AppState::new(config).await?;

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

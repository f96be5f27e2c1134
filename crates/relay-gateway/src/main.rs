//! Relay gateway binary.
//!
//! Configuration: defaults, then the JSON file named by `RELAY_CONFIG`, then
//! `RELAY_*` environment overrides. Logging honours `RUST_LOG`; set
//! `RELAY_LOG_JSON=1` for JSON lines.

use anyhow::{Context, Result};
use relay_gateway::{RelayConfig, RelayService};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("RELAY_LOG_JSON")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = RelayConfig::load().context("failed to load relay configuration")?;
    info!(
        version = relay_gateway::VERSION,
        addr = %config.http_addr(),
        "Starting relay gateway"
    );

    let service = RelayService::from_config(config).context("failed to build relay")?;
    service
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

//! Mirror trade-signal relay - entry point.
//!
//! Accepts master trading signals, fans them out to subscribed slave
//! terminals, and serves their command mailboxes.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Mirror trade-signal relay
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MIRROR_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    mirror_telemetry::init_logging()?;

    info!("Starting mirror relay v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("MIRROR_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = mirror_relay::RelayConfig::load_or_default(&config_path)?;

    let app = mirror_relay::Application::new(config);
    app.run().await?;

    Ok(())
}

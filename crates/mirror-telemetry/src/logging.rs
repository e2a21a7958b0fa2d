//! Structured logging initialization.

use crate::error::TelemetryResult;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing output for the relay.
///
/// `RUST_LOG` overrides the filter; without it, relay crates log at debug
/// and everything else at info. Production (`RUST_ENV=production`) gets
/// JSON lines for log shipping, development gets pretty output.
pub fn init_logging() -> TelemetryResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mirror=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    if is_production {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_target(true))
            .init();
    }

    Ok(())
}

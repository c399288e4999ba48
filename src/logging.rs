//! Tracing subscriber set-up.
//!
//! Logs always go to stderr: with the stdio transport, stdout carries the
//! MCP protocol stream.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter: `RUST_LOG` wins over the configured directive.
pub fn env_filter(configured: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(configured)
            .with_context(|| format!("Invalid 'logFilter' directive: \"{}\"", configured)),
    }
}

pub fn init_logging(configured: &str) -> Result<()> {
    let filter = env_filter(configured)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

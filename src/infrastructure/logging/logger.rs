//! `tracing` subscriber initialization.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::models::config::LoggingConfig;

fn parse_level(level: &str) -> Result<Level> {
    level.parse::<Level>().map_err(|_| anyhow::anyhow!("invalid log level: {level}"))
}

/// Initialize the global `tracing` subscriber from [`LoggingConfig`].
/// JSON formatting when `format = "json"`, human-readable otherwise.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let default_level = parse_level(&config.level)?;
    let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    if config.format == "json" {
        let layer = tracing_subscriber::fmt::layer().json().with_target(true).with_filter(env_filter);
        tracing_subscriber::registry().with(layer).try_init().ok();
    } else {
        let layer = tracing_subscriber::fmt::layer().with_target(true).with_filter(env_filter);
        tracing_subscriber::registry().with(layer).try_init().ok();
    }
    Ok(())
}

//! Log output for Relay
//!
//! Installs a `tracing-subscriber` writing to stderr so command output on
//! stdout stays clean.

#![allow(clippy::must_use_candidate)]

use relay_config::TelemetryConfig;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter from `RUST_LOG`, then `override_filter`, then the configured directive
///
/// Unparseable directives fall back to `info`.
pub fn filter(config: &TelemetryConfig, override_filter: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let directive = override_filter.unwrap_or(&config.log_filter);
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &TelemetryConfig, override_filter: Option<&str>) -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let fmt_layer = if config.json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.compact().boxed()
    };

    tracing_subscriber::registry()
        .with(filter(config, override_filter))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod catalog;
mod env;
mod loader;
mod provider;
mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;

pub use catalog::CatalogConfig;
pub use provider::ProviderConfig;
pub use telemetry::TelemetryConfig;

/// Top-level Relay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider credentials keyed by provider name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Model catalog override
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Provider entry by case-insensitive name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, provider)| provider)
    }
}

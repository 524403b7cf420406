#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod commands;

use std::sync::Arc;

use args::{Args, Command};
use clap::Parser;
use relay_config::Config;
use relay_llm::{AdapterRegistry, ModelCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };

    relay_telemetry::init(&config.telemetry, args.log_filter.as_deref())?;

    tracing::debug!(
        config_path = %args.config.display(),
        providers = config.providers.len(),
        "configuration loaded"
    );

    let registry = AdapterRegistry::with_defaults(Arc::new(load_catalog(&config)?));

    match args.command {
        Command::Models { provider, live } => commands::models(&registry, &config, provider.as_deref(), live).await,
        Command::Ping { provider } => commands::ping(&registry, &config, &provider).await,
        Command::Chat(chat) => commands::chat(&registry, &config, &chat).await,
    }
}

/// Catalog named by the configuration, or the built-in table
fn load_catalog(config: &Config) -> anyhow::Result<ModelCatalog> {
    let Some(catalog) = &config.catalog else {
        return Ok(ModelCatalog::builtin());
    };

    let raw = std::fs::read_to_string(&catalog.path)
        .map_err(|e| anyhow::anyhow!("failed to read catalog {}: {e}", catalog.path.display()))?;

    let loaded = ModelCatalog::from_toml_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse catalog {}: {e}", catalog.path.display()))?;

    tracing::debug!(path = %catalog.path.display(), models = loaded.len(), "catalog loaded");
    Ok(loaded)
}

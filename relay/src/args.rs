use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Relay chat-completion client
#[derive(Debug, Parser)]
#[command(name = "relay", about = "One chat-completion interface over several LLM providers")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Override the configured log filter
    #[arg(long, env = "RELAY_LOG")]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List models from the catalog or a provider's live endpoint
    Models {
        /// Restrict to one provider
        #[arg(long)]
        provider: Option<String>,
        /// Ask the provider instead of the catalog
        #[arg(long, requires = "provider")]
        live: bool,
    },
    /// Check that a provider accepts the configured credentials
    Ping {
        #[arg(long)]
        provider: String,
    },
    /// Send one prompt and print the reply
    Chat(ChatArgs),
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    #[arg(long)]
    pub provider: String,

    #[arg(long)]
    pub model: String,

    /// System instruction sent before the prompt
    #[arg(long)]
    pub system: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// JSON file holding an array of tool declarations
    #[arg(long)]
    pub tools: Option<PathBuf>,

    /// Wait for the whole reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    pub prompt: String,
}

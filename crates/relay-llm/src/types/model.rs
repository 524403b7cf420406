use serde::{Deserialize, Serialize};

/// Static description of a model offered by a provider
///
/// Keyed by `(provider, id)`. Catalog entries are loaded once and never
/// mutated during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier as sent upstream
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// Canonical lowercase provider name
    pub provider: String,
    /// Maximum context size in tokens
    #[serde(default)]
    pub context_window_tokens: u32,
    /// Whether the model accepts tool declarations
    #[serde(default)]
    pub supports_tools: bool,
    /// Whether the model supports a JSON response mode
    #[serde(default)]
    pub supports_json_mode: bool,
    /// Maximum tokens the model can generate in one response
    #[serde(default)]
    pub max_output_tokens: u32,
}

impl ModelDescriptor {
    /// Minimal descriptor for a model found by discovery but absent from the catalog
    pub fn discovered(provider: &str, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            provider: provider.to_owned(),
            context_window_tokens: 0,
            supports_tools: false,
            supports_json_mode: false,
            max_output_tokens: 0,
        }
    }
}

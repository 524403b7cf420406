//! Static model catalog
//!
//! Read-only table of [`ModelDescriptor`]s used for catalog queries and as the
//! fallback when a provider's discovery endpoint is unavailable.

use serde::Deserialize;

use crate::types::ModelDescriptor;

/// Table of known models keyed by `(provider, id)`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelCatalog {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    /// Build a catalog, normalizing provider names to lowercase
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        let models = models
            .into_iter()
            .map(|mut model| {
                model.provider = model.provider.to_ascii_lowercase();
                model
            })
            .collect();
        Self { models }
    }

    /// Parse a catalog from TOML made of `[[models]]` tables
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        let parsed: Self = toml::from_str(source)?;
        Ok(Self::new(parsed.models))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Every catalogued model
    pub fn all(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Models offered by one provider, in catalog order
    pub fn models_for(&self, provider: &str) -> Vec<ModelDescriptor> {
        self.models
            .iter()
            .filter(|m| m.provider.eq_ignore_ascii_case(provider))
            .cloned()
            .collect()
    }

    /// First model with this id across all providers
    pub fn find(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Model with this id under a specific provider
    pub fn find_in(&self, provider: &str, id: &str) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.id == id && m.provider.eq_ignore_ascii_case(provider))
    }

    /// Built-in table shipped with the crate
    pub fn builtin() -> Self {
        let entry = |provider: &str, id: &str, name: &str, context: u32, output: u32, tools: bool, json: bool| {
            ModelDescriptor {
                id: id.to_owned(),
                display_name: name.to_owned(),
                provider: provider.to_owned(),
                context_window_tokens: context,
                supports_tools: tools,
                supports_json_mode: json,
                max_output_tokens: output,
            }
        };

        Self::new(vec![
            entry("openai", "gpt-4.1", "GPT-4.1", 1_047_576, 32_768, true, true),
            entry("openai", "gpt-4.1-mini", "GPT-4.1 mini", 1_047_576, 32_768, true, true),
            entry("openai", "gpt-4o", "GPT-4o", 128_000, 16_384, true, true),
            entry("openai", "gpt-4o-mini", "GPT-4o mini", 128_000, 16_384, true, true),
            entry("openai", "o3-mini", "o3-mini", 200_000, 100_000, true, true),
            entry("anthropic", "claude-opus-4-20250514", "Claude Opus 4", 200_000, 32_000, true, false),
            entry("anthropic", "claude-sonnet-4-20250514", "Claude Sonnet 4", 200_000, 64_000, true, false),
            entry("anthropic", "claude-3-5-haiku-20241022", "Claude 3.5 Haiku", 200_000, 8_192, true, false),
            entry("gemini", "gemini-2.5-pro", "Gemini 2.5 Pro", 1_048_576, 65_536, true, true),
            entry("gemini", "gemini-2.5-flash", "Gemini 2.5 Flash", 1_048_576, 65_536, true, true),
            entry("gemini", "gemini-2.0-flash", "Gemini 2.0 Flash", 1_048_576, 8_192, true, true),
            entry("openrouter", "openai/gpt-4o", "OpenAI: GPT-4o", 128_000, 16_384, true, true),
            entry("openrouter", "anthropic/claude-sonnet-4", "Anthropic: Claude Sonnet 4", 200_000, 64_000, true, false),
            entry("openrouter", "google/gemini-2.5-flash", "Google: Gemini 2.5 Flash", 1_048_576, 65_536, true, true),
            entry("openrouter", "meta-llama/llama-3.3-70b-instruct", "Meta: Llama 3.3 70B Instruct", 131_072, 16_384, true, false),
            entry("mistral", "mistral-large-latest", "Mistral Large", 131_072, 8_192, true, true),
            entry("mistral", "mistral-small-latest", "Mistral Small", 131_072, 8_192, true, true),
            entry("mistral", "codestral-latest", "Codestral", 256_000, 8_192, true, true),
        ])
    }
}

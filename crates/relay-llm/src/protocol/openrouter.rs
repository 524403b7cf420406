//! `OpenRouter` wire format types beyond the OpenAI-compatible core

use serde::{Deserialize, Serialize};

/// `OpenRouter` models list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterModelList {
    pub data: Vec<OpenRouterModel>,
}

/// `OpenRouter` model entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterModel {
    /// Namespaced id, e.g. `anthropic/claude-sonnet-4`
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context_length: Option<u32>,
    #[serde(default)]
    pub top_provider: Option<OpenRouterTopProvider>,
    /// Request parameters the model honours, e.g. `tools`
    #[serde(default)]
    pub supported_parameters: Vec<String>,
}

/// Limits of the provider `OpenRouter` routes to by default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterTopProvider {
    #[serde(default)]
    pub max_completion_tokens: Option<u32>,
}

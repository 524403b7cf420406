//! Mistral wire format types beyond the OpenAI-compatible core

use serde::{Deserialize, Serialize};

/// Mistral models list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralModelList {
    pub data: Vec<MistralModel>,
}

/// Mistral model entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralModel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_context_length: Option<u32>,
    #[serde(default)]
    pub capabilities: MistralCapabilities,
}

/// Capability flags of a Mistral model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralCapabilities {
    #[serde(default = "enabled")]
    pub completion_chat: bool,
    #[serde(default)]
    pub function_calling: bool,
}

impl Default for MistralCapabilities {
    fn default() -> Self {
        Self {
            completion_chat: true,
            function_calling: false,
        }
    }
}

const fn enabled() -> bool {
    true
}

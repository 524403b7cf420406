//! Mistral adapter (OpenAI-compatible)

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AdapterBase, Auth};
use super::compat::{self, CompatProvider};
use super::{Adapter, AdapterOptions, ChunkSink};
use crate::catalog::ModelCatalog;
use crate::error::LlmError;
use crate::protocol::mistral::MistralModelList;
use crate::types::{ModelDescriptor, Request, Response};

/// Canonical provider name
pub const PROVIDER: &str = "mistral";

/// Default Mistral API base URL
const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Mistral adapter
#[derive(Debug)]
pub struct MistralAdapter {
    base: AdapterBase,
}

impl MistralAdapter {
    pub fn new(options: AdapterOptions, catalog: Arc<ModelCatalog>) -> Result<Self, LlmError> {
        let base = AdapterBase::new(PROVIDER, options, DEFAULT_BASE_URL, Auth::Bearer, catalog)?;
        Ok(Self { base })
    }
}

#[async_trait]
impl CompatProvider for MistralAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    async fn discover(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let list: MistralModelList = compat::fetch(&self.base, "models").await?;

        Ok(list
            .data
            .into_iter()
            .filter(|m| m.capabilities.completion_chat)
            .map(|m| {
                let mut model = ModelDescriptor::discovered(PROVIDER, m.id);
                if let Some(name) = m.name {
                    model.display_name = name;
                }
                model.context_window_tokens = m.max_context_length.unwrap_or_default();
                model.supports_tools = m.capabilities.function_calling;
                model
            })
            .collect())
    }
}

#[async_trait]
impl Adapter for MistralAdapter {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        compat::test_connection(self).await
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        compat::list_models(self).await
    }

    async fn send(&self, request: &Request) -> Result<Response, LlmError> {
        compat::send(&self.base, request).await
    }

    async fn send_streaming(&self, request: &Request, sink: &mut ChunkSink<'_>) -> Result<(), LlmError> {
        compat::send_streaming(&self.base, request, sink).await
    }

    fn cancel(&self) {
        self.base.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_is_canonical() {
        let adapter = MistralAdapter::new(AdapterOptions::new("key"), Arc::new(ModelCatalog::builtin())).unwrap();
        assert_eq!(adapter.provider(), "mistral");
        assert_eq!(adapter.base.endpoint("models"), "https://api.mistral.ai/v1/models");
    }

    #[test]
    fn embedding_models_are_not_chat_models() {
        let list: MistralModelList = serde_json::from_value(serde_json::json!({
            "object": "list",
            "data": [
                {"id": "mistral-large-latest", "max_context_length": 131072,
                 "capabilities": {"completion_chat": true, "function_calling": true}},
                {"id": "mistral-embed", "capabilities": {"completion_chat": false, "function_calling": false}}
            ]
        }))
        .unwrap();
        let chat: Vec<_> = list.data.iter().filter(|m| m.capabilities.completion_chat).collect();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].id, "mistral-large-latest");
    }
}

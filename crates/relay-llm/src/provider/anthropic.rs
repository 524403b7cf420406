//! Anthropic Messages API adapter

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AdapterBase, Auth, sse_events, swallow_cancel};
use super::{Adapter, AdapterOptions, ChunkSink, ensure_single_shot};
use crate::catalog::ModelCatalog;
use crate::convert::anthropic::AnthropicStreamState;
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicModelList, AnthropicRequest, AnthropicResponse, AnthropicStreamEvent};
use crate::types::{ModelDescriptor, Request, Response};

/// Canonical provider name
pub const PROVIDER: &str = "anthropic";

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Required API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic adapter
#[derive(Debug)]
pub struct AnthropicAdapter {
    base: AdapterBase,
}

impl AnthropicAdapter {
    pub fn new(options: AdapterOptions, catalog: Arc<ModelCatalog>) -> Result<Self, LlmError> {
        let base = AdapterBase::new(PROVIDER, options, DEFAULT_BASE_URL, Auth::Header("x-api-key"), catalog)?
            .with_default_header("anthropic-version", ANTHROPIC_VERSION);
        Ok(Self { base })
    }

    async fn discover(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let response = self.base.execute(self.base.get("models?limit=1000")).await?;
        let list: AnthropicModelList = self.base.read_json(response).await?;

        Ok(list
            .data
            .into_iter()
            .map(|m| {
                let mut model = ModelDescriptor::discovered(PROVIDER, m.id);
                if let Some(name) = m.display_name {
                    model.display_name = name;
                }
                model.supports_tools = true;
                model
            })
            .collect())
    }
}

#[async_trait]
impl Adapter for AnthropicAdapter {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        self.base.probe("models?limit=1").await
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.base.resolve_models(self.discover().await)
    }

    async fn send(&self, request: &Request) -> Result<Response, LlmError> {
        ensure_single_shot(PROVIDER, request)?;
        let wire_request = AnthropicRequest::from(request);
        let call = self.base.begin_call();

        self.base
            .cancellable(&call, async {
                let response = self
                    .base
                    .execute(self.base.post("messages").json(&wire_request))
                    .await?;
                let wire_response: AnthropicResponse = self.base.read_json(response).await?;
                Ok(wire_response.into())
            })
            .await
    }

    async fn send_streaming(&self, request: &Request, sink: &mut ChunkSink<'_>) -> Result<(), LlmError> {
        request.validate(PROVIDER)?;
        let mut wire_request = AnthropicRequest::from(request);
        wire_request.stream = Some(true);
        let call = self.base.begin_call();

        let result = async {
            let response = self
                .base
                .cancellable(&call, self.base.execute(self.base.post("messages").json(&wire_request)))
                .await?;

            let events = sse_events::<AnthropicStreamEvent>(PROVIDER, response);
            let mut state = AnthropicStreamState::new();
            self.base
                .pump(&call, events, |event| state.translate(PROVIDER, event), sink)
                .await
        }
        .await;

        swallow_cancel(result)
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
        let adapter =
            AnthropicAdapter::new(AdapterOptions::new("sk-ant-test"), Arc::new(ModelCatalog::builtin())).unwrap();
        assert_eq!(adapter.provider(), "anthropic");
    }

    #[test]
    fn caller_header_overrides_version_default() {
        let options = AdapterOptions::new("sk-ant-test").with_header("anthropic-version", "2024-01-01");
        let adapter = AnthropicAdapter::new(options, Arc::new(ModelCatalog::builtin())).unwrap();
        let request = adapter.base.get("models").build().unwrap();
        assert_eq!(request.headers()["anthropic-version"], "2024-01-01");
        assert_eq!(request.headers()["x-api-key"], "sk-ant-test");
    }
}

//! Gemini (Generative Language API) adapter

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AdapterBase, Auth, sse_events, swallow_cancel};
use super::{Adapter, AdapterOptions, ChunkSink, ensure_single_shot};
use crate::catalog::ModelCatalog;
use crate::convert::gemini::{GeminiStreamState, response_from_wire};
use crate::error::LlmError;
use crate::protocol::gemini::{GeminiModelList, GeminiRequest, GeminiResponse};
use crate::types::{ModelDescriptor, Request, Response};

/// Canonical provider name
pub const PROVIDER: &str = "gemini";

/// Default Generative Language API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generation method a listed model must support to be offered
const GENERATE_CONTENT: &str = "generateContent";

/// Gemini adapter
#[derive(Debug)]
pub struct GeminiAdapter {
    base: AdapterBase,
}

impl GeminiAdapter {
    pub fn new(options: AdapterOptions, catalog: Arc<ModelCatalog>) -> Result<Self, LlmError> {
        let base = AdapterBase::new(PROVIDER, options, DEFAULT_BASE_URL, Auth::Header("x-goog-api-key"), catalog)?;
        Ok(Self { base })
    }

    async fn discover(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let response = self.base.execute(self.base.get("models?pageSize=1000")).await?;
        let list: GeminiModelList = self.base.read_json(response).await?;

        Ok(list
            .models
            .into_iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_CONTENT))
            .map(|m| {
                let id = m.name.strip_prefix("models/").unwrap_or(&m.name).to_owned();
                let mut model = ModelDescriptor::discovered(PROVIDER, id);
                if let Some(name) = m.display_name {
                    model.display_name = name;
                }
                model.context_window_tokens = m.input_token_limit.unwrap_or_default();
                model.max_output_tokens = m.output_token_limit.unwrap_or_default();
                model
            })
            .collect())
    }
}

/// Path of a model method, accepting ids with or without the `models/` prefix
fn model_path(model: &str, method: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("models/{model}:{method}")
}

#[async_trait]
impl Adapter for GeminiAdapter {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        self.base.probe("models?pageSize=1").await
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.base.resolve_models(self.discover().await)
    }

    async fn send(&self, request: &Request) -> Result<Response, LlmError> {
        ensure_single_shot(PROVIDER, request)?;
        let wire_request = GeminiRequest::from(request);
        let path = model_path(&request.model, GENERATE_CONTENT);
        let call = self.base.begin_call();

        self.base
            .cancellable(&call, async {
                let response = self.base.execute(self.base.post(&path).json(&wire_request)).await?;
                let wire_response: GeminiResponse = self.base.read_json(response).await?;
                response_from_wire(PROVIDER, &request.model, wire_response)
            })
            .await
    }

    async fn send_streaming(&self, request: &Request, sink: &mut ChunkSink<'_>) -> Result<(), LlmError> {
        request.validate(PROVIDER)?;
        let wire_request = GeminiRequest::from(request);
        let path = model_path(&request.model, "streamGenerateContent?alt=sse");
        let call = self.base.begin_call();

        let result = async {
            let response = self
                .base
                .cancellable(&call, self.base.execute(self.base.post(&path).json(&wire_request)))
                .await?;

            let events = sse_events::<GeminiResponse>(PROVIDER, response);
            let mut state = GeminiStreamState::new();
            self.base
                .pump(&call, events, |event| Ok(state.translate(event)), sink)
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
    fn model_path_strips_resource_prefix() {
        assert_eq!(
            model_path("gemini-2.5-flash", GENERATE_CONTENT),
            "models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            model_path("models/gemini-2.5-pro", "streamGenerateContent?alt=sse"),
            "models/gemini-2.5-pro:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn key_is_sent_as_header_not_query() {
        let adapter = GeminiAdapter::new(AdapterOptions::new("AIza-test"), Arc::new(ModelCatalog::builtin())).unwrap();
        let request = adapter.base.get("models").build().unwrap();
        assert_eq!(request.headers()["x-goog-api-key"], "AIza-test");
        assert!(request.url().query().is_none());
    }
}

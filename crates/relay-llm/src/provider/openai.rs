//! `OpenAI` Chat Completions adapter

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AdapterBase, Auth, sse_events, swallow_cancel};
use super::{Adapter, AdapterOptions, ChunkSink, ensure_single_shot};
use crate::catalog::ModelCatalog;
use crate::convert::openai::{OpenAiStreamState, response_from_wire};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiModelList, OpenAiRequest, OpenAiResponse, OpenAiStreamEvent};
use crate::types::{ModelDescriptor, Request, Response};

/// Canonical provider name
pub const PROVIDER: &str = "openai";

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model id fragments for endpoints other than chat completions
const NON_CHAT_MARKERS: &[&str] = &[
    "embedding",
    "whisper",
    "tts",
    "dall-e",
    "audio",
    "realtime",
    "transcribe",
    "image",
    "moderation",
    "search",
];

/// `OpenAI` adapter
#[derive(Debug)]
pub struct OpenAiAdapter {
    base: AdapterBase,
}

impl OpenAiAdapter {
    pub fn new(options: AdapterOptions, catalog: Arc<ModelCatalog>) -> Result<Self, LlmError> {
        let base = AdapterBase::new(PROVIDER, options, DEFAULT_BASE_URL, Auth::Bearer, catalog)?;
        Ok(Self { base })
    }

    async fn discover(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let response = self.base.execute(self.base.get("models")).await?;
        let list: OpenAiModelList = self.base.read_json(response).await?;

        Ok(list
            .data
            .into_iter()
            .filter(|m| is_chat_model(&m.id))
            .map(|m| ModelDescriptor::discovered(PROVIDER, m.id))
            .collect())
    }

    fn wire_request(request: &Request) -> OpenAiRequest {
        OpenAiRequest::from(request).with_completion_token_limit()
    }
}

/// Whether a listed model serves chat completions
fn is_chat_model(id: &str) -> bool {
    let chat_family = id.starts_with("gpt-") || id.starts_with("chatgpt-") || id.starts_with('o');
    chat_family && !NON_CHAT_MARKERS.iter().any(|marker| id.contains(marker))
}

#[async_trait]
impl Adapter for OpenAiAdapter {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn test_connection(&self) -> bool {
        self.base.probe("models").await
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.base.resolve_models(self.discover().await)
    }

    async fn send(&self, request: &Request) -> Result<Response, LlmError> {
        ensure_single_shot(PROVIDER, request)?;
        let wire_request = Self::wire_request(request);
        let call = self.base.begin_call();

        self.base
            .cancellable(&call, async {
                let response = self
                    .base
                    .execute(self.base.post("chat/completions").json(&wire_request))
                    .await?;
                let wire_response: OpenAiResponse = self.base.read_json(response).await?;
                response_from_wire(PROVIDER, wire_response)
            })
            .await
    }

    async fn send_streaming(&self, request: &Request, sink: &mut ChunkSink<'_>) -> Result<(), LlmError> {
        request.validate(PROVIDER)?;
        let wire_request = Self::wire_request(request).streaming();
        let call = self.base.begin_call();

        let result = async {
            let response = self
                .base
                .cancellable(
                    &call,
                    self.base
                        .execute(self.base.post("chat/completions").json(&wire_request)),
                )
                .await?;

            let events = sse_events::<OpenAiStreamEvent>(PROVIDER, response);
            let mut state = OpenAiStreamState::new();
            self.base
                .pump(&call, events, |event| state.translate_event(PROVIDER, event), sink)
                .await
        }
        .await;

        swallow_cancel(result)
    }

    fn cancel(&self) {
        self.base.cancel();
    }
}

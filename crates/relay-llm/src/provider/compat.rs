//! Shared client for OpenAI-compatible providers
//!
//! Requests and responses use the `OpenAI` wire format; the streaming body is
//! consumed as raw bytes through [`crate::frame`] rather than an event-stream
//! decoder.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::base::{AdapterBase, swallow_cancel};
use super::{ChunkSink, ensure_single_shot};
use crate::convert::openai::{OpenAiStreamState, response_from_wire};
use crate::error::LlmError;
use crate::frame::frames;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse, OpenAiStreamEvent};
use crate::types::{ModelDescriptor, Request, Response};

const COMPLETIONS_PATH: &str = "chat/completions";

/// Provider-specific parts of an OpenAI-compatible adapter
#[async_trait]
pub(crate) trait CompatProvider: Send + Sync {
    fn base(&self) -> &AdapterBase;

    /// Path of the cheapest authenticated endpoint
    fn probe_path(&self) -> &'static str {
        "models"
    }

    /// Live model discovery
    async fn discover(&self) -> Result<Vec<ModelDescriptor>, LlmError>;
}

/// GET a path and decode its JSON body
pub(crate) async fn fetch<T: DeserializeOwned>(base: &AdapterBase, path: &str) -> Result<T, LlmError> {
    let response = base.execute(base.get(path)).await?;
    base.read_json(response).await
}

pub(crate) async fn test_connection(provider: &impl CompatProvider) -> bool {
    provider.base().probe(provider.probe_path()).await
}

pub(crate) async fn list_models(provider: &impl CompatProvider) -> Vec<ModelDescriptor> {
    let discovered = provider.discover().await;
    provider.base().resolve_models(discovered)
}

pub(crate) async fn send(base: &AdapterBase, request: &Request) -> Result<Response, LlmError> {
    ensure_single_shot(base.provider(), request)?;
    let wire_request = OpenAiRequest::from(request);
    let call = base.begin_call();

    base.cancellable(&call, async {
        let response = base.execute(base.post(COMPLETIONS_PATH).json(&wire_request)).await?;
        let wire_response: OpenAiResponse = base.read_json(response).await?;
        response_from_wire(base.provider(), wire_response)
    })
    .await
}

pub(crate) async fn send_streaming(
    base: &AdapterBase,
    request: &Request,
    sink: &mut ChunkSink<'_>,
) -> Result<(), LlmError> {
    request.validate(base.provider())?;
    let wire_request = OpenAiRequest::from(request).streaming();
    let provider = base.provider();
    let call = base.begin_call();

    let result = async {
        let response = base
            .cancellable(&call, base.execute(base.post(COMPLETIONS_PATH).json(&wire_request)))
            .await?;

        let payloads = frames(provider, response.bytes_stream());
        let mut state = OpenAiStreamState::new();
        base.pump(
            &call,
            payloads,
            |payload| {
                let event: OpenAiStreamEvent = serde_json::from_value(payload)
                    .map_err(|e| LlmError::decode(provider, format!("unexpected stream frame: {e}")))?;
                state.translate_event(provider, event)
            },
            sink,
        )
        .await
    }
    .await;

    swallow_cancel(result)
}

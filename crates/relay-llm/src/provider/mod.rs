//! Adapter contract and per-provider implementations

pub mod anthropic;
pub mod base;
mod compat;
pub mod gemini;
pub mod mistral;
pub mod openai;
pub mod openrouter;

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use url::Url;

use crate::error::LlmError;
use crate::types::{ModelDescriptor, Request, Response, StreamChunk};

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use mistral::MistralAdapter;
pub use openai::OpenAiAdapter;
pub use openrouter::OpenRouterAdapter;

/// Receiver for streamed chunks
pub type ChunkSink<'a> = dyn FnMut(StreamChunk) + Send + 'a;

/// Construction parameters shared by every adapter
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// API key, must not be empty
    pub api_key: SecretString,
    /// Endpoint override replacing the provider's default base URL
    pub base_url: Option<Url>,
    /// Extra headers sent with every upstream request
    pub headers: Vec<(String, String)>,
}

impl AdapterOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Capability interface implemented by each provider back end
///
/// An adapter runs at most one `send`/`send_streaming` call at a time;
/// starting a new one cancels the previous.
#[async_trait]
pub trait Adapter: fmt::Debug + Send + Sync {
    /// Canonical lowercase provider name
    fn provider(&self) -> &str;

    /// Issue the cheapest authenticated call, reporting only success
    async fn test_connection(&self) -> bool;

    /// Live model discovery, falling back to the static catalog
    async fn list_models(&self) -> Vec<ModelDescriptor>;

    /// Single-shot completion
    async fn send(&self, request: &Request) -> Result<Response, LlmError>;

    /// Streaming completion delivering chunks to `sink`
    ///
    /// Returns `Ok(())` when the stream completes or is cancelled. `sink` is
    /// never invoked after this returns or after [`Adapter::cancel`].
    async fn send_streaming(&self, request: &Request, sink: &mut ChunkSink<'_>) -> Result<(), LlmError>;

    /// Abort the outstanding call, if any
    fn cancel(&self);
}

/// Reject requests that carry the streaming flag on the single-shot path
pub(crate) fn ensure_single_shot(provider: &str, request: &Request) -> Result<(), LlmError> {
    request.validate(provider)?;
    if request.stream {
        return Err(LlmError::invalid(provider, "request has stream = true, use send_streaming"));
    }
    Ok(())
}

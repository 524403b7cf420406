//! `OpenRouter` adapter
//!
//! OpenAI-compatible; attribution is sent through the optional `HTTP-Referer`
//! and `X-Title` headers.

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AdapterBase, Auth};
use super::compat::{self, CompatProvider};
use super::{Adapter, AdapterOptions, ChunkSink};
use crate::catalog::ModelCatalog;
use crate::error::LlmError;
use crate::protocol::openrouter::OpenRouterModelList;
use crate::types::{ModelDescriptor, Request, Response};

/// Canonical provider name
pub const PROVIDER: &str = "openrouter";

/// Default `OpenRouter` API base URL
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Header naming the calling site for `OpenRouter` rankings
pub const REFERER_HEADER: &str = "HTTP-Referer";

/// Header naming the calling app for `OpenRouter` rankings
pub const TITLE_HEADER: &str = "X-Title";

/// `OpenRouter` adapter
#[derive(Debug)]
pub struct OpenRouterAdapter {
    base: AdapterBase,
}

impl OpenRouterAdapter {
    pub fn new(options: AdapterOptions, catalog: Arc<ModelCatalog>) -> Result<Self, LlmError> {
        let base = AdapterBase::new(PROVIDER, options, DEFAULT_BASE_URL, Auth::Bearer, catalog)?;
        Ok(Self { base })
    }
}

/// Attribution headers for [`AdapterOptions`]
pub fn attribution(options: AdapterOptions, referer: Option<&str>, title: Option<&str>) -> AdapterOptions {
    let options = match referer {
        Some(referer) => options.with_header(REFERER_HEADER, referer),
        None => options,
    };
    match title {
        Some(title) => options.with_header(TITLE_HEADER, title),
        None => options,
    }
}

#[async_trait]
impl CompatProvider for OpenRouterAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    /// The models list is public, so the key endpoint is the real credential check
    fn probe_path(&self) -> &'static str {
        "key"
    }

    async fn discover(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let list: OpenRouterModelList = compat::fetch(&self.base, "models").await?;

        Ok(list
            .data
            .into_iter()
            .map(|m| {
                let mut model = ModelDescriptor::discovered(PROVIDER, m.id);
                if let Some(name) = m.name {
                    model.display_name = name;
                }
                model.context_window_tokens = m.context_length.unwrap_or_default();
                model.max_output_tokens = m
                    .top_provider
                    .and_then(|p| p.max_completion_tokens)
                    .unwrap_or_default();
                model.supports_tools = m.supported_parameters.iter().any(|p| p == "tools");
                model.supports_json_mode = m.supported_parameters.iter().any(|p| p == "response_format");
                model
            })
            .collect())
    }
}

#[async_trait]
impl Adapter for OpenRouterAdapter {
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

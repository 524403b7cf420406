//! Shared adapter lifecycle
//!
//! Credential validation, endpoint resolution, the upstream error/logging
//! convention, the single-in-flight call slot, and the cancellable stream
//! pump every translator feeds its decoded events through.

use std::future::Future;
use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use super::{AdapterOptions, ChunkSink};
use crate::cancel::{CallGuard, CallSlot};
use crate::catalog::ModelCatalog;
use crate::error::LlmError;
use crate::frame::DONE_SENTINEL;
use crate::types::{ModelDescriptor, StreamChunk};

/// How the API key is presented upstream
#[derive(Debug, Clone, Copy)]
pub enum Auth {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Key sent verbatim in the named header
    Header(&'static str),
}

/// State and helpers common to every adapter
#[derive(Debug)]
pub struct AdapterBase {
    provider: &'static str,
    client: Client,
    base_url: Url,
    api_key: SecretString,
    auth: Auth,
    headers: HeaderMap,
    catalog: Arc<ModelCatalog>,
    calls: CallSlot,
}

impl AdapterBase {
    /// Validate options and resolve the endpoint
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingCredential` for an empty API key and
    /// `LlmError::InvalidRequest` for an unusable base URL or header.
    pub fn new(
        provider: &'static str,
        options: AdapterOptions,
        default_base_url: &str,
        auth: Auth,
        catalog: Arc<ModelCatalog>,
    ) -> Result<Self, LlmError> {
        if options.api_key.expose_secret().trim().is_empty() {
            return Err(LlmError::MissingCredential {
                provider: provider.to_owned(),
            });
        }

        let base_url = match options.base_url {
            Some(url) => url,
            None => Url::parse(default_base_url)
                .map_err(|e| LlmError::invalid(provider, format!("invalid base URL: {e}")))?,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| LlmError::invalid(provider, format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| LlmError::invalid(provider, format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        Ok(Self {
            provider,
            client: Client::new(),
            base_url,
            api_key: options.api_key,
            auth,
            headers,
            catalog,
            calls: CallSlot::new(),
        })
    }

    /// Add a header sent with every request unless the caller already set it
    #[must_use]
    pub fn with_default_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
        self
    }

    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Join a path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{}", path.trim_start_matches('/'))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.endpoint(path)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.endpoint(path)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.headers(self.headers.clone());
        let key = self.api_key.expose_secret();
        match self.auth {
            Auth::Bearer => builder.bearer_auth(key),
            Auth::Header(name) => builder.header(name, key),
        }
    }

    /// Send a request, mapping network failures and non-2xx statuses
    pub async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %self.provider, error = %e, "upstream request failed");
            LlmError::transport(self.provider, e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = %self.provider,
                status = %status,
                "upstream returned error"
            );
            return Err(LlmError::transport(
                self.provider,
                format!("provider returned {status}: {body}"),
            ));
        }

        Ok(response)
    }

    /// Read and decode a JSON body
    pub async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, LlmError> {
        let body = response.text().await.map_err(|e| {
            tracing::error!(provider = %self.provider, error = %e, "failed to read upstream body");
            LlmError::transport(self.provider, e.to_string())
        })?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(provider = %self.provider, error = %e, "failed to decode upstream body");
            LlmError::decode(self.provider, format!("failed to parse response: {e}"))
        })
    }

    /// GET a path and report whether it succeeded
    pub async fn probe(&self, path: &str) -> bool {
        match self.execute(self.get(path)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(provider = %self.provider, error = %e, "connection test failed");
                false
            }
        }
    }

    /// Start a call, cancelling the previous one
    pub fn begin_call(&self) -> CallGuard<'_> {
        self.calls.begin()
    }

    pub fn cancel(&self) {
        self.calls.cancel();
    }

    /// Run a future until it completes or the call is cancelled
    pub async fn cancellable<T, F>(&self, call: &CallGuard<'_>, future: F) -> Result<T, LlmError>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        tokio::select! {
            biased;
            () = call.token().cancelled() => {
                tracing::debug!(provider = %self.provider, "call cancelled");
                Err(LlmError::Cancelled)
            }
            result = future => result,
        }
    }

    /// Drive decoded upstream events through a translator into the sink
    ///
    /// The token is observed while waiting for the next event, which drops the
    /// upstream body on cancellation, and again before every sink invocation.
    pub async fn pump<S, T, F>(
        &self,
        call: &CallGuard<'_>,
        events: S,
        mut translate: F,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), LlmError>
    where
        S: Stream<Item = Result<T, LlmError>>,
        F: FnMut(T) -> Result<Vec<StreamChunk>, LlmError>,
    {
        let mut events = std::pin::pin!(events);

        loop {
            let next = tokio::select! {
                biased;
                () = call.token().cancelled() => {
                    tracing::debug!(provider = %self.provider, "stream cancelled");
                    return Ok(());
                }
                next = events.next() => next,
            };

            let Some(event) = next else {
                tracing::debug!(provider = %self.provider, "stream completed");
                return Ok(());
            };

            let chunks = event.and_then(&mut translate).inspect_err(|e| {
                tracing::error!(provider = %self.provider, error = %e, "stream failed");
            })?;

            for chunk in chunks {
                if call.is_cancelled() {
                    tracing::debug!(provider = %self.provider, "stream cancelled");
                    return Ok(());
                }
                sink(chunk);
            }
        }
    }

    /// Catalogued models for this provider
    pub fn catalog_models(&self) -> Vec<ModelDescriptor> {
        self.catalog.models_for(self.provider)
    }

    /// Prefer discovered models, falling back to the catalog
    ///
    /// Discovered ids the catalog knows are replaced by the curated entry.
    pub fn resolve_models(&self, discovered: Result<Vec<ModelDescriptor>, LlmError>) -> Vec<ModelDescriptor> {
        match discovered {
            Ok(models) if !models.is_empty() => models
                .into_iter()
                .map(|model| {
                    self.catalog
                        .find_in(self.provider, &model.id)
                        .cloned()
                        .unwrap_or(model)
                })
                .collect(),
            Ok(_) => {
                tracing::debug!(provider = %self.provider, "discovery returned no models, using catalog");
                self.catalog_models()
            }
            Err(e) => {
                tracing::warn!(provider = %self.provider, error = %e, "model discovery failed, using catalog");
                self.catalog_models()
            }
        }
    }
}

/// Decode a structured `text/event-stream` body into typed events
///
/// Ends at the `[DONE]` sentinel or when the body ends. Events whose data does
/// not decode are logged and skipped; read errors are yielded.
pub fn sse_events<T>(provider: &'static str, response: reqwest::Response) -> impl Stream<Item = Result<T, LlmError>> + Send
where
    T: DeserializeOwned + Send,
{
    response
        .bytes_stream()
        .eventsource()
        .take_while(|result| {
            let done = matches!(result, Ok(event) if event.data.trim() == DONE_SENTINEL);
            std::future::ready(!done)
        })
        .filter_map(move |result| {
            let item = match result {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => match serde_json::from_str::<T>(&event.data) {
                    Ok(parsed) => Some(Ok(parsed)),
                    Err(e) => {
                        tracing::warn!(
                            provider = %provider,
                            event = %event.event,
                            error = %e,
                            "skipping unparseable stream event"
                        );
                        None
                    }
                },
                Err(e) => Some(Err(LlmError::transport(provider, format!("stream read failed: {e}")))),
            };
            std::future::ready(item)
        })
}

/// Map the result of a streaming call, treating cancellation as success
pub fn swallow_cancel(result: Result<(), LlmError>) -> Result<(), LlmError> {
    match result {
        Err(LlmError::Cancelled) => Ok(()),
        other => other,
    }
}

#![allow(dead_code)]

pub mod upstream;

use std::sync::Arc;

use relay_llm::{Adapter, AdapterOptions, AdapterRegistry, ModelCatalog, StreamChunk};

use self::upstream::MockUpstream;

/// Adapter for `provider` pointed at the mock, mounted under `prefix`
pub fn adapter(provider: &str, upstream: &MockUpstream, prefix: &str) -> Arc<dyn Adapter> {
    adapter_with(provider, AdapterOptions::new("test-key").with_base_url(upstream.base_url(prefix)))
}

pub fn adapter_with(provider: &str, options: AdapterOptions) -> Arc<dyn Adapter> {
    AdapterRegistry::with_defaults(Arc::new(ModelCatalog::builtin()))
        .create(provider, options)
        .unwrap()
}

/// Run a streaming call and collect every chunk
pub async fn collect(
    adapter: &dyn Adapter,
    request: &relay_llm::Request,
) -> (Result<(), relay_llm::LlmError>, Vec<StreamChunk>) {
    let mut chunks = Vec::new();
    let result = adapter
        .send_streaming(request, &mut |chunk: StreamChunk| chunks.push(chunk))
        .await;
    (result, chunks)
}

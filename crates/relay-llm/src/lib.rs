//! Provider adapter layer for Relay
//!
//! Translates one canonical chat-completion model to and from `OpenAI`,
//! Anthropic, Gemini, `OpenRouter` and Mistral, covering single-shot and
//! streaming calls with tool-call reconstruction and cooperative cancellation.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod assembly;
pub mod cancel;
pub mod catalog;
pub mod convert;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod types;

pub use assembly::{Assembled, ToolCallAssembler};
pub use catalog::ModelCatalog;
pub use error::LlmError;
pub use provider::{Adapter, AdapterOptions, ChunkSink};
pub use registry::AdapterRegistry;
pub use types::{Message, ModelDescriptor, Request, Response, Role, StreamChunk, Tool, ToolCall, ToolResult};

//! Canonical provider-agnostic types
//!
//! Every translator converts its wire format to and from these shapes. They
//! are all `serde` serializable so downstream consumers can forward them as-is.

pub mod message;
pub mod model;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Message, Role, ToolCall, ToolResult};
pub use model::ModelDescriptor;
pub use request::Request;
pub use response::{AssistantMessage, FinishReason, Response, Usage};
pub use stream::{ChunkDelta, StreamChunk, ToolCallDelta};
pub use tool::Tool;

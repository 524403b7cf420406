//! Translation between canonical types and provider wire formats
//!
//! Each submodule converts requests outbound, responses inbound, and holds
//! the per-call state that reconstructs tool calls from streamed events.

pub mod anthropic;
pub mod gemini;
pub mod openai;

/// Identifier for a tool call the upstream did not name
pub(crate) fn generate_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Arguments to send upstream, never empty
pub(crate) fn arguments_or_empty_object(arguments: &str) -> String {
    if arguments.trim().is_empty() {
        "{}".to_owned()
    } else {
        arguments.to_owned()
    }
}

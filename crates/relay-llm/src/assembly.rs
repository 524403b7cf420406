//! Folding a chunk sequence back into text and complete tool calls

use crate::error::LlmError;
use crate::types::{StreamChunk, ToolCall};

/// Result of assembling a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembled {
    /// Concatenated text deltas
    pub content: String,
    /// Tool calls in first-sighting order
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
    /// Only the start placeholder has been seen
    placeholder: bool,
}

/// Accumulator fed with every chunk a streaming call produced
#[derive(Debug)]
pub struct ToolCallAssembler {
    provider: String,
    content: String,
    calls: Vec<PendingCall>,
}

impl ToolCallAssembler {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_owned(),
            content: String::new(),
            calls: Vec::new(),
        }
    }

    /// Fold one chunk into the accumulated state
    pub fn push(&mut self, chunk: &StreamChunk) {
        if let Some(text) = &chunk.delta.content {
            self.content.push_str(text);
        }

        for delta in chunk.delta.tool_calls.iter().flatten() {
            let position = self.calls.iter().position(|c| c.id == delta.id);

            if let Some(name) = &delta.name {
                match position {
                    Some(i) => self.calls[i].name.clone_from(name),
                    None => self.calls.push(PendingCall {
                        id: delta.id.clone(),
                        name: name.clone(),
                        arguments: delta.arguments.clone(),
                        placeholder: true,
                    }),
                }
                continue;
            }

            let index = position.unwrap_or_else(|| {
                self.calls.push(PendingCall {
                    id: delta.id.clone(),
                    name: String::new(),
                    arguments: String::new(),
                    placeholder: true,
                });
                self.calls.len() - 1
            });

            let call = &mut self.calls[index];
            if delta.replace || call.placeholder {
                call.arguments.clone_from(&delta.arguments);
            } else {
                call.arguments.push_str(&delta.arguments);
            }
            call.placeholder = false;
        }
    }

    /// Text accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Finish assembly, validating every call's arguments
    ///
    /// Empty arguments become `{}`.
    pub fn finish(self) -> Result<Assembled, LlmError> {
        let mut tool_calls = Vec::with_capacity(self.calls.len());

        for call in self.calls {
            let arguments = if call.arguments.trim().is_empty() {
                "{}".to_owned()
            } else {
                call.arguments
            };

            if let Err(e) = serde_json::from_str::<serde_json::Value>(&arguments) {
                return Err(LlmError::decode(
                    &self.provider,
                    format!("tool call {} has malformed arguments: {e}", call.id),
                ));
            }

            tool_calls.push(ToolCall::new(call.id, call.name, arguments));
        }

        Ok(Assembled {
            content: self.content,
            tool_calls,
        })
    }

    /// Finish a stream that ended early, keeping only calls whose arguments
    /// already parse
    pub fn finish_partial(self) -> Assembled {
        let tool_calls = self
            .calls
            .into_iter()
            .filter_map(|call| {
                let arguments = if call.arguments.trim().is_empty() {
                    "{}".to_owned()
                } else {
                    call.arguments
                };
                serde_json::from_str::<serde_json::Value>(&arguments)
                    .is_ok()
                    .then(|| ToolCall::new(call.id, call.name, arguments))
            })
            .collect();

        Assembled {
            content: self.content,
            tool_calls,
        }
    }
}

//! Conversion between canonical types and Anthropic wire format

use super::arguments_or_empty_object;
use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse,
    AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool,
};
use crate::types::{FinishReason, Message, Request, Response, Role, StreamChunk, ToolCall, ToolCallDelta, Usage};

/// Default max tokens when not specified (Anthropic requires this field)
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Highest temperature the Messages API accepts
const MAX_TEMPERATURE: f32 = 1.0;

// -- Outbound: canonical request -> Anthropic wire request --

impl From<&Request> for AnthropicRequest {
    fn from(req: &Request) -> Self {
        let mut system: Vec<&str> = Vec::new();
        let mut messages = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => system.push(&msg.content),
                Role::User | Role::Assistant => messages.push(wire_message(msg)),
            }
        }

        let tools = req.declared_tools().map(|tools| {
            tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: (!t.description.is_empty()).then(|| t.description.clone()),
                    input_schema: t.parameter_schema.clone(),
                })
                .collect()
        });

        Self {
            model: req.model.clone(),
            max_tokens: req.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            temperature: req.temperature.map(|t| t.min(MAX_TEMPERATURE)),
            stream: req.stream.then_some(true),
            tools,
        }
    }
}

/// Convert a canonical message to Anthropic wire format
///
/// Tool results lead the content, as the API requires them to directly
/// answer the preceding assistant turn.
fn wire_message(msg: &Message) -> AnthropicMessage {
    let role = match msg.role {
        Role::Assistant => "assistant",
        Role::User | Role::System => "user",
    };

    let results = msg.tool_results.as_deref().unwrap_or_default();
    let calls = msg.tool_calls.as_deref().unwrap_or_default();

    if results.is_empty() && calls.is_empty() {
        return AnthropicMessage {
            role: role.to_owned(),
            content: AnthropicContent::Text(msg.content.clone()),
        };
    }

    let mut blocks: Vec<AnthropicContentBlock> = results
        .iter()
        .map(|r| AnthropicContentBlock::ToolResult {
            tool_use_id: r.tool_call_id.clone(),
            content: r.content.clone(),
        })
        .collect();

    if !msg.content.is_empty() {
        blocks.push(AnthropicContentBlock::Text {
            text: msg.content.clone(),
        });
    }

    for tc in calls {
        let input = tc.arguments_value().unwrap_or_else(|_| serde_json::json!({}));
        blocks.push(AnthropicContentBlock::ToolUse {
            id: tc.id.clone(),
            name: tc.name.clone(),
            input,
        });
    }

    AnthropicMessage {
        role: role.to_owned(),
        content: AnthropicContent::Blocks(blocks),
    }
}

// -- Inbound: Anthropic wire response -> canonical response --

impl From<AnthropicResponse> for Response {
    fn from(resp: AnthropicResponse) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                AnthropicResponseBlock::Text { text: t } => text.push_str(&t),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    let arguments = arguments_or_empty_object(&input.to_string());
                    tool_calls.push(ToolCall::new(id, name, arguments));
                }
                AnthropicResponseBlock::Unknown => {}
            }
        }

        let mut response = Self::assemble(resp.id, resp.model, text, tool_calls);
        response.finish_reason = resp.stop_reason.as_deref().and_then(FinishReason::parse);
        response.usage = resp.usage.map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        });
        response
    }
}

// -- Stream conversion --

/// State tracker for converting Anthropic stream events
///
/// `input_json_delta` events carry no id, so the open `tool_use` block's id is
/// attached to each fragment. A new `tool_use` start implicitly closes any
/// call still open.
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    message_id: String,
    /// Id of the open `tool_use` block
    open_tool: Option<String>,
}

impl AnthropicStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert an Anthropic stream event into canonical chunks
    ///
    /// An in-stream `error` event fails the call.
    pub fn translate(&mut self, provider: &str, event: AnthropicStreamEvent) -> Result<Vec<StreamChunk>, LlmError> {
        let chunks = match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.message_id = message.id;
                Vec::new()
            }

            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamContentBlock::Text { text } if !text.is_empty() => {
                    vec![StreamChunk::text(self.message_id.clone(), text)]
                }
                AnthropicStreamContentBlock::ToolUse { id, name } => {
                    self.open_tool = Some(id.clone());
                    vec![StreamChunk::tool_call(
                        self.message_id.clone(),
                        ToolCallDelta::start(id, name),
                    )]
                }
                AnthropicStreamContentBlock::Text { .. } | AnthropicStreamContentBlock::Unknown => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } if !text.is_empty() => {
                    vec![StreamChunk::text(self.message_id.clone(), text)]
                }
                AnthropicStreamDelta::InputJsonDelta { partial_json } if !partial_json.is_empty() => {
                    match &self.open_tool {
                        Some(id) => vec![StreamChunk::tool_call(
                            self.message_id.clone(),
                            ToolCallDelta::fragment(id.clone(), partial_json),
                        )],
                        None => {
                            tracing::debug!(provider = %provider, "input_json_delta without an open tool_use block");
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockStop { .. } | AnthropicStreamEvent::MessageStop => {
                self.open_tool = None;
                Vec::new()
            }

            AnthropicStreamEvent::Error { error } => {
                return Err(LlmError::transport(
                    provider,
                    format!("{}: {}", error.error_type, error.message),
                ));
            }

            AnthropicStreamEvent::MessageDelta { .. }
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::Unknown => Vec::new(),
        };
        Ok(chunks)
    }
}

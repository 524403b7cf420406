//! Conversion between canonical types and `OpenAI` wire format
//!
//! Also used verbatim by the OpenAI-compatible providers.

use std::collections::HashMap;

use super::{arguments_or_empty_object, generate_call_id};
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiStreamEvent, OpenAiStreamToolCall, OpenAiTool, OpenAiToolCall,
};
use crate::types::{
    ChunkDelta, FinishReason, Message, Request, Response, StreamChunk, ToolCall, ToolCallDelta, Usage,
};

// -- Outbound: canonical request -> OpenAI wire request --

impl From<&Request> for OpenAiRequest {
    fn from(req: &Request) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.iter().flat_map(wire_messages).collect(),
            temperature: req.temperature,
            max_tokens: req.max_output_tokens,
            max_completion_tokens: None,
            stream: req.stream.then_some(true),
            tools: req.declared_tools().map(|tools| {
                tools
                    .iter()
                    .map(|t| OpenAiTool {
                        tool_type: t.kind.clone(),
                        function: OpenAiFunction {
                            name: t.name.clone(),
                            description: (!t.description.is_empty()).then(|| t.description.clone()),
                            parameters: Some(t.parameter_schema.clone()),
                        },
                    })
                    .collect()
            }),
        }
    }
}

impl OpenAiRequest {
    /// Move the output limit to `max_completion_tokens`, which `OpenAI`
    /// requires for reasoning models and accepts for all others
    #[must_use]
    pub fn with_completion_token_limit(mut self) -> Self {
        self.max_completion_tokens = self.max_tokens.take();
        self
    }

    #[must_use]
    pub const fn streaming(mut self) -> Self {
        self.stream = Some(true);
        self
    }
}

/// Expand one canonical message into wire messages
///
/// Tool results become `tool` role messages placed ahead of the message that
/// carries them; a message with nothing besides results is dropped.
fn wire_messages(msg: &Message) -> Vec<OpenAiMessage> {
    let mut out = Vec::new();

    let results = msg.tool_results.as_deref().unwrap_or_default();
    for result in results {
        out.push(OpenAiMessage {
            role: "tool".to_owned(),
            content: Some(result.content.clone()),
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id.clone()),
        });
    }

    let tool_calls = msg.tool_calls.as_deref().filter(|calls| !calls.is_empty()).map(|calls| {
        calls
            .iter()
            .map(|tc| OpenAiToolCall {
                id: tc.id.clone(),
                tool_type: "function".to_owned(),
                function: OpenAiFunctionCall {
                    name: tc.name.clone(),
                    arguments: arguments_or_empty_object(&tc.arguments),
                },
            })
            .collect::<Vec<_>>()
    });

    if !results.is_empty() && msg.content.is_empty() && tool_calls.is_none() {
        return out;
    }

    let content = if msg.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(msg.content.clone())
    };

    out.push(OpenAiMessage {
        role: msg.role.as_str().to_owned(),
        content,
        tool_calls,
        tool_call_id: None,
    });
    out
}

// -- Inbound: OpenAI wire response -> canonical response --

/// Convert a single-shot response, using the first choice
pub fn response_from_wire(provider: &str, resp: OpenAiResponse) -> Result<Response, LlmError> {
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(LlmError::decode(provider, "response contained no choices"));
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall::new(tc.id, tc.function.name, arguments_or_empty_object(&tc.function.arguments)))
        .collect();

    let mut response = Response::assemble(
        resp.id,
        resp.model,
        choice.message.content.unwrap_or_default(),
        tool_calls,
    );
    response.finish_reason = choice.finish_reason.as_deref().and_then(FinishReason::parse);
    response.usage = resp.usage.map(|u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });
    Ok(response)
}

// -- Stream conversion --

/// Per-call state turning `OpenAI` stream chunks into canonical chunks
///
/// Tool calls are keyed by their upstream `index`, so parallel calls may be
/// open at once. A new id at a known index starts a new call.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    stream_id: String,
    open: HashMap<u32, String>,
}

impl OpenAiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one stream event, failing on an in-band error
    pub fn translate_event(&mut self, provider: &str, event: OpenAiStreamEvent) -> Result<Vec<StreamChunk>, LlmError> {
        match event {
            OpenAiStreamEvent::Chunk(chunk) => Ok(self.translate(chunk)),
            OpenAiStreamEvent::Error(body) => Err(LlmError::transport(provider, body.error.message)),
        }
    }

    /// Translate one upstream chunk
    pub fn translate(&mut self, chunk: OpenAiStreamChunk) -> Vec<StreamChunk> {
        if self.stream_id.is_empty() && !chunk.id.is_empty() {
            self.stream_id = chunk.id;
        }

        let mut out = Vec::new();
        for choice in chunk.choices {
            let content = choice.delta.content.filter(|text| !text.is_empty());

            let mut deltas = Vec::new();
            for (position, call) in choice.delta.tool_calls.unwrap_or_default().into_iter().enumerate() {
                let position = u32::try_from(position).unwrap_or(u32::MAX);
                self.tool_call_deltas(call, position, &mut deltas);
            }

            if content.is_some() || !deltas.is_empty() {
                out.push(StreamChunk {
                    id: self.stream_id.clone(),
                    delta: ChunkDelta {
                        content,
                        tool_calls: (!deltas.is_empty()).then_some(deltas),
                    },
                });
            }

            if choice.finish_reason.is_some() {
                self.open.clear();
            }
        }
        out
    }

    fn tool_call_deltas(&mut self, call: OpenAiStreamToolCall, position: u32, deltas: &mut Vec<ToolCallDelta>) {
        let index = call.index.unwrap_or(position);
        let (name, arguments) = call
            .function
            .map(|f| (f.name, f.arguments))
            .unwrap_or_default();

        let call_id = call.id.filter(|id| !id.is_empty());
        let starts_new = match (&call_id, self.open.get(&index)) {
            (Some(id), Some(open)) => id != open,
            (_, None) => true,
            (None, Some(_)) => false,
        };

        if starts_new {
            let id = call_id.unwrap_or_else(generate_call_id);
            deltas.push(ToolCallDelta::start(id.clone(), name.unwrap_or_default()));
            self.open.insert(index, id);
        }

        if let Some(arguments) = arguments.filter(|a| !a.is_empty())
            && let Some(id) = self.open.get(&index)
        {
            deltas.push(ToolCallDelta::fragment(id.clone(), arguments));
        }
    }
}

//! Conversion between canonical types and Gemini wire format

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::generate_call_id;
use crate::error::LlmError;
use crate::protocol::gemini::{
    GeminiContent, GeminiFunctionCall, GeminiFunctionDeclaration, GeminiFunctionResponse, GeminiGenerationConfig,
    GeminiPart, GeminiRequest, GeminiResponse, GeminiTool,
};
use crate::types::{FinishReason, Message, Request, Response, Role, StreamChunk, ToolCall, ToolCallDelta, Usage};

/// Schema keywords the Gemini function-declaration subset rejects
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &["$schema", "additionalProperties"];

// -- Outbound: canonical request -> Gemini wire request --

impl From<&Request> for GeminiRequest {
    fn from(req: &Request) -> Self {
        let mut system = Vec::new();
        let mut contents = Vec::new();
        // Function responses are matched by name, which results may omit
        let mut call_names: HashMap<&str, &str> = HashMap::new();

        for msg in &req.messages {
            for call in msg.tool_calls.iter().flatten() {
                call_names.insert(&call.id, &call.name);
            }

            match msg.role {
                Role::System => system.push(GeminiPart::text(msg.content.clone())),
                Role::User => contents.extend(user_contents(msg, &call_names)),
                Role::Assistant => contents.push(model_content(msg)),
            }
        }

        let generation_config = (req.temperature.is_some() || req.max_output_tokens.is_some()).then(|| {
            GeminiGenerationConfig {
                temperature: req.temperature,
                max_output_tokens: req.max_output_tokens,
            }
        });

        let tools = req.declared_tools().map(|tools| {
            vec![GeminiTool {
                function_declarations: tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: (!t.description.is_empty()).then(|| t.description.clone()),
                        parameters: Some(sanitize_schema(t.parameter_schema.clone())),
                    })
                    .collect(),
            }]
        });

        Self {
            contents,
            system_instruction: (!system.is_empty()).then(|| GeminiContent { role: None, parts: system }),
            generation_config,
            tools,
        }
    }
}

/// User turn, preceded by a turn of function responses when it carries results
fn user_contents(msg: &Message, call_names: &HashMap<&str, &str>) -> Vec<GeminiContent> {
    let mut out = Vec::new();

    let results = msg.tool_results.as_deref().unwrap_or_default();
    if !results.is_empty() {
        let parts = results
            .iter()
            .map(|r| {
                let name = r
                    .name
                    .clone()
                    .or_else(|| call_names.get(r.tool_call_id.as_str()).map(|n| (*n).to_owned()))
                    .unwrap_or_else(|| r.tool_call_id.clone());
                GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        id: None,
                        name,
                        response: response_object(&r.content),
                    }),
                    ..GeminiPart::default()
                }
            })
            .collect();
        out.push(GeminiContent {
            role: Some("user".to_owned()),
            parts,
        });
    }

    if results.is_empty() || !msg.content.is_empty() {
        out.push(GeminiContent {
            role: Some("user".to_owned()),
            parts: vec![GeminiPart::text(msg.content.clone())],
        });
    }
    out
}

fn model_content(msg: &Message) -> GeminiContent {
    let mut parts = Vec::new();
    if !msg.content.is_empty() {
        parts.push(GeminiPart::text(msg.content.clone()));
    }

    for tc in msg.tool_calls.iter().flatten() {
        let args = tc.arguments_value().unwrap_or_else(|_| Value::Object(Map::new()));
        parts.push(GeminiPart {
            function_call: Some(GeminiFunctionCall {
                id: None,
                name: tc.name.clone(),
                args,
            }),
            ..GeminiPart::default()
        });
    }

    // Gemini rejects contents without parts
    if parts.is_empty() {
        parts.push(GeminiPart::text(String::new()));
    }

    GeminiContent {
        role: Some("model".to_owned()),
        parts,
    }
}

/// Tool output as the JSON object `functionResponse.response` requires
fn response_object(content: &str) -> Value {
    match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => value,
        Ok(value) => serde_json::json!({ "result": value }),
        Err(_) => serde_json::json!({ "result": content }),
    }
}

/// Strip schema keywords Gemini does not accept, at every depth
fn sanitize_schema(mut schema: Value) -> Value {
    fn strip(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for key in UNSUPPORTED_SCHEMA_KEYS {
                    map.remove(*key);
                }
                map.values_mut().for_each(strip);
            }
            Value::Array(items) => items.iter_mut().for_each(strip),
            _ => {}
        }
    }
    strip(&mut schema);
    schema
}

// -- Inbound: Gemini wire response -> canonical response --

/// Convert a single-shot response from the first candidate
///
/// `model` is reported when the upstream omits `modelVersion`.
pub fn response_from_wire(provider: &str, model: &str, resp: GeminiResponse) -> Result<Response, LlmError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(LlmError::decode(provider, "response contained no candidates"));
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.parts {
        if part.thought == Some(true) {
            continue;
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            let id = call.id.unwrap_or_else(generate_call_id);
            let args = match call.args {
                Value::Null => "{}".to_owned(),
                args => args.to_string(),
            };
            tool_calls.push(ToolCall::new(id, call.name, args));
        }
    }

    let mut finish_reason = candidate.finish_reason.as_deref().and_then(FinishReason::parse);
    // Gemini reports STOP even when it stopped to call functions
    if !tool_calls.is_empty() && finish_reason == Some(FinishReason::Stop) {
        finish_reason = Some(FinishReason::ToolCalls);
    }

    let mut response = Response::assemble(
        resp.response_id.unwrap_or_else(generate_response_id),
        resp.model_version.unwrap_or_else(|| model.to_owned()),
        text,
        tool_calls,
    );
    response.finish_reason = finish_reason;
    response.usage = resp.usage_metadata.map(|u| Usage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });
    Ok(response)
}

fn generate_response_id() -> String {
    format!("gen_{}", uuid::Uuid::new_v4().simple())
}

// -- Stream conversion --

#[derive(Debug)]
struct OpenCall {
    id: String,
    name: String,
    args: Map<String, Value>,
}

/// State tracker for Gemini stream events
///
/// Each `functionCall` part carries an `args` object that is merged key by
/// key into the open call; the whole accumulator is re-emitted as a replacing
/// continuation. Only the first call of an event may continue the call left
/// open by the previous event; later calls in the same event are parallel
/// calls and always open their own. A different id or name also opens a new
/// call, and a finish reason closes whatever is open.
#[derive(Debug, Default)]
pub struct GeminiStreamState {
    response_id: Option<String>,
    open: Option<OpenCall>,
}

impl GeminiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one stream event
    pub fn translate(&mut self, event: GeminiResponse) -> Vec<StreamChunk> {
        let id = self
            .response_id
            .get_or_insert_with(|| event.response_id.clone().unwrap_or_else(generate_response_id))
            .clone();

        let mut out = Vec::new();
        let Some(candidate) = event.candidates.into_iter().next() else {
            return out;
        };

        let mut calls_in_event = 0;
        for part in candidate.content.parts {
            if part.thought == Some(true) {
                continue;
            }
            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                out.push(StreamChunk::text(id.clone(), text));
            }
            if let Some(call) = part.function_call {
                self.merge_call(&id, call, calls_in_event == 0, &mut out);
                calls_in_event += 1;
            }
        }

        if candidate.finish_reason.is_some() {
            self.open = None;
        }
        out
    }

    fn merge_call(
        &mut self,
        stream_id: &str,
        call: GeminiFunctionCall,
        may_continue: bool,
        out: &mut Vec<StreamChunk>,
    ) {
        let continues = may_continue
            && self.open.as_ref().is_some_and(|open| {
                open.name == call.name && call.id.as_ref().is_none_or(|id| *id == open.id)
            });

        if !continues {
            let id = call.id.unwrap_or_else(generate_call_id);
            out.push(StreamChunk::tool_call(
                stream_id,
                ToolCallDelta::start(id.clone(), call.name.clone()),
            ));
            self.open = Some(OpenCall {
                id,
                name: call.name,
                args: Map::new(),
            });
        }

        let Some(open) = self.open.as_mut() else {
            return;
        };
        if let Value::Object(args) = call.args {
            open.args.extend(args);
        }
        let snapshot = Value::Object(open.args.clone()).to_string();
        out.push(StreamChunk::tool_call(stream_id, ToolCallDelta::snapshot(open.id.clone(), snapshot)));
    }
}

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::Tool;
use crate::error::LlmError;

/// Highest sampling temperature any supported provider accepts
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Canonical completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Model identifier
    pub model: String,
    /// Conversation messages, must not be empty
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// Whether the caller intends to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl Request {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_output_tokens: None,
            tools: None,
            stream: false,
        }
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub const fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Tools to send upstream, `None` when absent or empty
    pub(crate) fn declared_tools(&self) -> Option<&[Tool]> {
        self.tools.as_deref().filter(|tools| !tools.is_empty())
    }

    /// Check the invariants every provider relies on
    ///
    /// `provider` names the back end the request is bound for and prefixes
    /// the error message.
    pub fn validate(&self, provider: &str) -> Result<(), LlmError> {
        if self.messages.is_empty() {
            return Err(LlmError::invalid(provider, "request must contain at least one message"));
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=MAX_TEMPERATURE).contains(&temperature)
        {
            return Err(LlmError::invalid(
                provider,
                format!("temperature {temperature} is outside 0.0..={MAX_TEMPERATURE}"),
            ));
        }

        Ok(())
    }
}

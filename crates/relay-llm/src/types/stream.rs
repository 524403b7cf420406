use serde::{Deserialize, Serialize};

/// Placeholder arguments carried by the first sighting of a tool call
pub const START_ARGUMENTS: &str = "{}";

/// One incremental unit of a streaming response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Upstream response identifier, stable for the whole stream
    pub id: String,
    /// Incremental data
    pub delta: ChunkDelta,
}

impl StreamChunk {
    /// Chunk carrying only text
    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delta: ChunkDelta {
                content: Some(content.into()),
                tool_calls: None,
            },
        }
    }

    /// Chunk carrying a single tool-call delta
    pub fn tool_call(id: impl Into<String>, delta: ToolCallDelta) -> Self {
        Self {
            id: id.into(),
            delta: ChunkDelta {
                content: None,
                tool_calls: Some(vec![delta]),
            },
        }
    }
}

/// Incremental content of a stream chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool-call starts and continuations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Incremental tool-call data
///
/// A start carries the function name and [`START_ARGUMENTS`]. A continuation
/// has no name; its `arguments` are appended to earlier continuations for the
/// same id, or replace them entirely when `replace` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Tool call ID
    pub id: String,
    /// Function name, present on the start delta only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments fragment or full arguments document
    pub arguments: String,
    /// Arguments are the whole accumulated object rather than a fragment
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace: bool,
}

impl ToolCallDelta {
    /// First sighting of a call
    pub fn start(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            arguments: START_ARGUMENTS.to_owned(),
            replace: false,
        }
    }

    /// Fragment to concatenate after earlier fragments of the same call
    pub fn fragment(id: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            arguments: arguments.into(),
            replace: false,
        }
    }

    /// Complete arguments document superseding everything before it
    pub fn snapshot(id: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            arguments: arguments.into(),
            replace: true,
        }
    }

    pub const fn is_start(&self) -> bool {
        self.name.is_some()
    }
}

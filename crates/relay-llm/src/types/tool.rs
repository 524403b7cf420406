use serde::{Deserialize, Serialize};

/// Definition of a tool the model can call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind (currently always "function")
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the function parameters
    #[serde(default = "empty_object_schema")]
    pub parameter_schema: serde_json::Value,
}

impl Tool {
    /// Declare a function tool
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameter_schema: serde_json::Value) -> Self {
        Self {
            kind: default_kind(),
            name: name.into(),
            description: description.into(),
            parameter_schema,
        }
    }
}

fn default_kind() -> String {
    "function".to_owned()
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

//! Tool calling types.

use serde::{Deserialize, Serialize};

/// Tool definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the tool input.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, input_schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A model-issued tool call. `id` joins it with its eventual result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

impl ToolUse {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            tool_input,
        }
    }
}

/// Incremental tool call fragment carried by a streaming chunk.
///
/// The first delta of a call usually carries the name; later ones append
/// argument text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fragment: Option<String>,
}

impl ToolCallDelta {
    pub fn started(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: Some(tool_name.into()),
            input_fragment: None,
        }
    }

    pub fn fragment(id: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: None,
            input_fragment: Some(fragment.into()),
        }
    }

    /// A whole call in one delta, as replayed by the fallback stream.
    pub fn complete(tool_use: &ToolUse) -> Self {
        Self {
            id: tool_use.id.clone(),
            tool_name: Some(tool_use.tool_name.clone()),
            input_fragment: Some(tool_use.tool_input.to_string()),
        }
    }
}

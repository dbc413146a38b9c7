//! Per-call execution options.

use crate::types::tool::ToolDefinition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Audio,
    Video,
    Embed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub model: String,
    /// Backend-specific model parameters (temperature, max_tokens, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub model_options: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Opaque backend-native history from the previous turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<serde_json::Value>,
    /// JSON Schema the result must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_schema: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_modality: Option<Modality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_original_response: Option<bool>,
}

impl ExecutionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_model_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.model_options.insert(key.into(), value);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_conversation(mut self, conversation: serde_json::Value) -> Self {
        self.conversation = Some(conversation);
        self
    }

    pub fn with_result_schema(mut self, schema: serde_json::Value) -> Self {
        self.result_schema = Some(schema);
        self
    }

    /// Use the JSON Schema of `T` as the result schema.
    pub fn with_result_type<T: JsonSchema>(self) -> Self {
        let schema = schemars::schema_for!(T);
        match serde_json::to_value(schema) {
            Ok(schema) => self.with_result_schema(schema),
            Err(_) => self,
        }
    }

    pub fn with_output_modality(mut self, modality: Modality) -> Self {
        self.output_modality = Some(modality);
        self
    }

    pub fn include_original_response(mut self, include: bool) -> Self {
        self.include_original_response = Some(include);
        self
    }

    #[inline]
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

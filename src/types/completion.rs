//! Completion results, streaming chunks and execution responses.

use crate::types::tool::{ToolCallDelta, ToolUse};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One part of a completion result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CompletionResult {
    Text(String),
    Json(serde_json::Value),
    /// Image payload: URL or base64 data.
    Image(String),
}

impl CompletionResult {
    pub fn text(value: impl Into<String>) -> Self {
        CompletionResult::Text(value.into())
    }

    /// Text rendering of this part. JSON is serialized, images render empty.
    pub fn to_text(&self) -> String {
        match self {
            CompletionResult::Text(s) => s.clone(),
            CompletionResult::Json(v) => v.to_string(),
            CompletionResult::Image(_) => String::new(),
        }
    }
}

/// Concatenated text of a result sequence.
pub fn result_text(results: &[CompletionResult]) -> String {
    results.iter().map(CompletionResult::to_text).collect()
}

/// Why generation stopped, normalized across vendors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    #[inline]
    pub fn is_tool_use(&self) -> bool {
        matches!(self, FinishReason::ToolUse)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolUse => "tool_use",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        match value {
            "stop" | "end_turn" | "stop_sequence" | "STOP" | "COMPLETE" => FinishReason::Stop,
            "length" | "max_tokens" | "MAX_TOKENS" => FinishReason::Length,
            "tool_use" | "tool_calls" | "function_call" => FinishReason::ToolUse,
            "content_filter" | "SAFETY" | "RECITATION" | "guardrail_intervened" => {
                FinishReason::ContentFilter
            }
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        FinishReason::from(value.as_str())
    }
}

impl From<FinishReason> for String {
    fn from(value: FinishReason) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token accounting. Backends report what they know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

impl TokenUsage {
    pub fn new(prompt: u32, result: u32) -> Self {
        Self {
            prompt: Some(prompt),
            result: Some(result),
            total: Some(prompt + result),
        }
    }

    /// Fold a later report into this one: known values replace earlier ones.
    pub fn merge(&mut self, later: &TokenUsage) {
        self.prompt = later.prompt.or(self.prompt);
        self.result = later.result.or(self.result);
        self.total = later.total.or(self.total);
    }

    /// Total tokens, summing prompt and result when no total was reported.
    pub fn total_or_sum(&self) -> Option<u32> {
        self.total.or(match (self.prompt, self.result) {
            (Some(p), Some(r)) => Some(p + r),
            _ => None,
        })
    }
}

/// Non-fatal problem recorded on a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CompletionError {
    pub const VALIDATION_ERROR: &'static str = "validation_error";

    pub fn validation(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            code: Self::VALIDATION_ERROR.to_string(),
            message: message.into(),
            data,
        }
    }

    pub fn is_validation_error(&self) -> bool {
        self.code == Self::VALIDATION_ERROR
    }
}

/// A finished, non-streaming model response as returned by a backend hook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub result: Vec<CompletionResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_use: Vec<ToolUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Backend-native conversation including this exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CompletionError>,
    /// Raw backend response. Dropped unless the caller asked for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_response: Option<serde_json::Value>,
}

impl Completion {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            result: vec![CompletionResult::text(value)],
            finish_reason: Some(FinishReason::Stop),
            ..Self::default()
        }
    }

    /// Concatenated text of the result parts.
    pub fn result_text(&self) -> String {
        result_text(&self.result)
    }

    #[inline]
    pub fn has_tool_use(&self) -> bool {
        !self.tool_use.is_empty()
    }

    /// Enforce that the finish reason reports tool use iff tool calls are present.
    pub fn normalize_finish_reason(&mut self) {
        if self.has_tool_use() {
            self.finish_reason = Some(FinishReason::ToolUse);
        } else if self.finish_reason.as_ref().is_some_and(FinishReason::is_tool_use) {
            self.finish_reason = Some(FinishReason::Stop);
        }
    }
}

/// Incremental fragment of a streaming response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub result: Vec<CompletionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_use: Vec<ToolCallDelta>,
}

impl CompletionChunk {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            result: vec![CompletionResult::text(value)],
            ..Self::default()
        }
    }

    pub fn finish(reason: FinishReason, token_usage: Option<TokenUsage>) -> Self {
        Self {
            finish_reason: Some(reason),
            token_usage,
            ..Self::default()
        }
    }

    pub fn tool(delta: ToolCallDelta) -> Self {
        Self {
            tool_use: vec![delta],
            ..Self::default()
        }
    }
}

impl From<&Completion> for CompletionChunk {
    /// The whole completion as a single synthetic chunk.
    fn from(completion: &Completion) -> Self {
        Self {
            result: completion.result.clone(),
            finish_reason: completion.finish_reason.clone(),
            token_usage: completion.token_usage,
            tool_use: completion
                .tool_use
                .iter()
                .map(ToolCallDelta::complete)
                .collect(),
        }
    }
}

/// What `execute` returns: the completion plus exchange metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    #[serde(flatten)]
    pub completion: Completion,
    /// Backend-native prompt that was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<serde_json::Value>,
    /// Wall-clock duration of the exchange.
    pub execution_time_ms: u64,
    pub exchange_id: String,
}

impl ExecutionResponse {
    pub fn result_text(&self) -> String {
        self.completion.result_text()
    }
}

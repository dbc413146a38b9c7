//! Folding streamed chunks into a final completion: text is concatenated,
//! tool call fragments are assembled per call id, and the last finish reason
//! and merged token usage are kept.

use crate::types::{CompletionChunk, CompletionResult, FinishReason, TokenUsage, ToolCallDelta, ToolUse};
use serde_json::Value;

/// Collects tool call deltas (start + argument fragments) into final [`ToolUse`]s.
/// Tolerant: arguments that fail to parse as JSON are kept as the raw string.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    calls: Vec<(ToolUse, String)>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_delta(&mut self, delta: &ToolCallDelta) {
        let index = match self.calls.iter().position(|(t, _)| t.id == delta.id) {
            Some(index) => index,
            None => {
                self.calls.push((ToolUse::new(delta.id.clone(), String::new(), Value::Null), String::new()));
                self.calls.len() - 1
            }
        };
        let (tool_use, arguments) = &mut self.calls[index];
        if let Some(name) = &delta.tool_name {
            if tool_use.tool_name.is_empty() {
                tool_use.tool_name = name.clone();
            }
        }
        if let Some(fragment) = &delta.input_fragment {
            arguments.push_str(fragment);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn finalize(self) -> Vec<ToolUse> {
        self.calls
            .into_iter()
            .map(|(mut tool_use, arguments)| {
                let trimmed = arguments.trim();
                tool_use.tool_input = if trimmed.is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(trimmed).unwrap_or(Value::String(arguments))
                };
                tool_use
            })
            .collect()
    }
}

/// Running state of a default-strategy stream.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    result: Vec<CompletionResult>,
    tools: ToolCallAssembler,
    finish_reason: Option<FinishReason>,
    token_usage: Option<TokenUsage>,
    chunks: usize,
}

/// What a stream accumulated once the backend sequence ended.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Accumulated {
    pub result: Vec<CompletionResult>,
    pub tool_use: Vec<ToolUse>,
    pub finish_reason: Option<FinishReason>,
    pub token_usage: Option<TokenUsage>,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &CompletionChunk) {
        self.chunks += 1;
        for part in &chunk.result {
            if let (Some(CompletionResult::Text(buffer)), CompletionResult::Text(text)) =
                (self.result.last_mut(), part)
            {
                buffer.push_str(text);
                continue;
            }
            self.result.push(part.clone());
        }
        for delta in &chunk.tool_use {
            self.tools.on_delta(delta);
        }
        if let Some(reason) = &chunk.finish_reason {
            self.finish_reason = Some(reason.clone());
        }
        if let Some(usage) = &chunk.token_usage {
            self.token_usage
                .get_or_insert_with(TokenUsage::default)
                .merge(usage);
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Text received so far.
    pub fn text(&self) -> String {
        crate::types::result_text(&self.result)
    }

    pub fn finish(self) -> Accumulated {
        Accumulated {
            result: self.result,
            tool_use: self.tools.finalize(),
            finish_reason: self.finish_reason,
            token_usage: self.token_usage,
        }
    }
}

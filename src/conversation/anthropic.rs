//! Messages-API shape: `{role, content}` where content is a string or a list
//! of blocks; calls are `tool_use` blocks in assistant turns and results are
//! `tool_result` blocks in user turns.

use super::{collect_text, ConversationFormat, ToolCallRef, ToolResult, TurnRole, TurnView};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicMessages;

impl AnthropicMessages {
    fn result_block(result: &ToolResult) -> Value {
        let mut block = json!({
            "type": "tool_result",
            "tool_use_id": result.tool_use_id,
            "content": result.content,
        });
        if result.is_error {
            block["is_error"] = Value::Bool(true);
        }
        block
    }

    fn blocks(content: Option<&Value>) -> Vec<Value> {
        match content {
            Some(Value::Array(blocks)) => blocks.clone(),
            Some(Value::String(s)) if !s.is_empty() => vec![json!({"type": "text", "text": s})],
            _ => Vec::new(),
        }
    }
}

fn block_type(block: &Value) -> Option<&str> {
    block.get("type").and_then(Value::as_str)
}

impl ConversationFormat for AnthropicMessages {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn view(&self, turn: &Value) -> TurnView {
        let role = match turn.get("role").and_then(Value::as_str) {
            Some("assistant") => TurnRole::Assistant,
            Some("system") => TurnRole::System,
            _ => TurnRole::User,
        };
        let mut view = TurnView::new(role);
        let content = turn.get("content");
        view.text = content.and_then(collect_text);

        if let Some(Value::Array(blocks)) = content {
            for block in blocks {
                match block_type(block) {
                    Some("tool_use") => {
                        if let Some(id) = block.get("id").and_then(Value::as_str) {
                            let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                            view.tool_calls.push(ToolCallRef::new(id, name));
                        }
                    }
                    Some("tool_result") => {
                        if let Some(id) = block.get("tool_use_id").and_then(Value::as_str) {
                            let mut result = ToolResult::new(
                                id,
                                block.get("content").and_then(collect_text).unwrap_or_default(),
                            );
                            result.is_error = block
                                .get("is_error")
                                .and_then(Value::as_bool)
                                .unwrap_or(false);
                            view.tool_results.push(result);
                        }
                    }
                    _ => {}
                }
            }
        }
        view
    }

    /// Results are prepended to a user turn, ahead of any real results it
    /// already carries. Any other turn gets a new user turn in front of it.
    fn insert_results_before(&self, turn: &Value, results: &[ToolResult]) -> Vec<Value> {
        let synthetic = results.iter().map(Self::result_block);
        if turn.get("role").and_then(Value::as_str) != Some("user") {
            return vec![
                json!({"role": "user", "content": synthetic.collect::<Vec<_>>()}),
                turn.clone(),
            ];
        }

        let content: Vec<Value> = synthetic
            .chain(Self::blocks(turn.get("content")))
            .collect();

        let mut repaired = turn.clone();
        repaired["content"] = Value::Array(content);
        vec![repaired]
    }

    fn results_turns(&self, results: &[ToolResult]) -> Vec<Value> {
        vec![json!({
            "role": "user",
            "content": results.iter().map(Self::result_block).collect::<Vec<_>>(),
        })]
    }
}

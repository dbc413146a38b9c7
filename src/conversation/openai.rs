//! Chat-completions shape: assistant messages carry `tool_calls`, each answered
//! by a separate `{role: "tool", tool_call_id, content}` message.

use super::{collect_text, ConversationFormat, ToolCallRef, ToolResult, TurnRole, TurnView};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiChat;

impl OpenAiChat {
    fn tool_message(result: &ToolResult) -> Value {
        json!({
            "role": "tool",
            "tool_call_id": result.tool_use_id,
            "content": result.content,
        })
    }
}

impl ConversationFormat for OpenAiChat {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn view(&self, turn: &Value) -> TurnView {
        let role = match turn.get("role").and_then(Value::as_str) {
            Some("assistant") => TurnRole::Assistant,
            Some("system") | Some("developer") => TurnRole::System,
            Some("tool") => TurnRole::Tool,
            _ => TurnRole::User,
        };
        let mut view = TurnView::new(role);
        view.text = turn.get("content").and_then(collect_text);

        if role == TurnRole::Tool {
            if let Some(id) = turn.get("tool_call_id").and_then(Value::as_str) {
                view.tool_results
                    .push(ToolResult::new(id, view.text.clone().unwrap_or_default()));
            }
            return view;
        }

        if let Some(calls) = turn.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                if let Some(id) = call.get("id").and_then(Value::as_str) {
                    let name = call
                        .pointer("/function/name")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    view.tool_calls.push(ToolCallRef::new(id, name));
                }
            }
        }
        view
    }

    fn insert_results_before(&self, turn: &Value, results: &[ToolResult]) -> Vec<Value> {
        results
            .iter()
            .map(Self::tool_message)
            .chain(std::iter::once(turn.clone()))
            .collect()
    }

    fn results_turns(&self, results: &[ToolResult]) -> Vec<Value> {
        results.iter().map(Self::tool_message).collect()
    }
}

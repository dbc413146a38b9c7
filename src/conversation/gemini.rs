//! Gemini `contents` shape: `{role, parts}` with `functionCall` parts in model
//! turns and `functionResponse` parts in user (or `function`) turns. Older
//! models omit call ids, so the function name doubles as the id.

use super::{ConversationFormat, ToolCallRef, ToolResult, TurnRole, TurnView};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiContents;

fn call_id(part: &Value) -> Option<String> {
    part.get("id")
        .or_else(|| part.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl GeminiContents {
    fn response_part(result: &ToolResult) -> Value {
        let name = result.tool_name.as_deref().unwrap_or(&result.tool_use_id);
        let mut response = json!({
            "name": name,
            "response": {"output": result.content},
        });
        if name != result.tool_use_id {
            response["id"] = Value::String(result.tool_use_id.clone());
        }
        json!({ "functionResponse": response })
    }
}

impl ConversationFormat for GeminiContents {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn view(&self, turn: &Value) -> TurnView {
        let role = match turn.get("role").and_then(Value::as_str) {
            Some("model") => TurnRole::Assistant,
            Some("function") => TurnRole::Tool,
            Some("system") => TurnRole::System,
            _ => TurnRole::User,
        };
        let mut view = TurnView::new(role);
        let Some(parts) = turn.get("parts").and_then(Value::as_array) else {
            return view;
        };

        let mut text = String::new();
        for part in parts {
            if let Some(t) = part.get("text").and_then(Value::as_str) {
                text.push_str(t);
            }
            if let Some(call) = part.get("functionCall") {
                if let Some(id) = call_id(call) {
                    let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
                    view.tool_calls.push(ToolCallRef::new(id, name));
                }
            }
            if let Some(response) = part.get("functionResponse") {
                if let Some(id) = call_id(response) {
                    let content = response
                        .get("response")
                        .map(|r| match r.get("output") {
                            Some(Value::String(s)) => s.clone(),
                            _ => r.to_string(),
                        })
                        .unwrap_or_default();
                    view.tool_results.push(ToolResult::new(id, content));
                }
            }
        }
        if !text.is_empty() {
            view.text = Some(text);
        }
        view
    }

    fn insert_results_before(&self, turn: &Value, results: &[ToolResult]) -> Vec<Value> {
        let synthetic = results.iter().map(Self::response_part);
        if turn.get("role").and_then(Value::as_str) == Some("model") {
            return vec![
                json!({"role": "user", "parts": synthetic.collect::<Vec<_>>()}),
                turn.clone(),
            ];
        }

        let parts = turn
            .get("parts")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let merged: Vec<Value> = synthetic.chain(parts).collect();

        let mut repaired = turn.clone();
        repaired["parts"] = Value::Array(merged);
        vec![repaired]
    }

    fn results_turns(&self, results: &[ToolResult]) -> Vec<Value> {
        vec![json!({
            "role": "user",
            "parts": results.iter().map(Self::response_part).collect::<Vec<_>>(),
        })]
    }
}

//! Conversation repair for interrupted tool calls.
//!
//! A model turn may issue tool calls. If the exchange is interrupted before
//! the caller supplies the results, the next request would carry unanswered
//! calls, which most backends reject. [`repair_turns`] walks the history and
//! synthesizes a placeholder result for every dangling call, right after the
//! call (before the next non-tool turn, or at the end).
//!
//! The algorithm runs once, generically, over [`TurnView`]. Each backend
//! family implements [`ConversationFormat`] to translate its native turn
//! shape into the view and to splice results back into native turns.
//!
//! Conversations are never mutated in place: every function here returns a
//! new value, so a caller's conversation can be re-used safely.

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicMessages;
pub use gemini::GeminiContents;
pub use openai::OpenAiChat;

use serde_json::Value;
use tracing::debug;

/// Abstract role of a native turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnRole {
    System,
    User,
    Assistant,
    /// A turn that only carries tool results (e.g. OpenAI `role: "tool"`).
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolCallRef {
    pub id: String,
    pub name: String,
}

impl ToolCallRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A tool result as seen through the abstract view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub tool_name: Option<String>,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn new(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            tool_name: None,
            content: content.into(),
            is_error: false,
        }
    }

    /// Placeholder answering a call the user interrupted.
    pub fn interrupted(call: &ToolCallRef) -> Self {
        Self {
            tool_use_id: call.id.clone(),
            tool_name: Some(call.name.clone()),
            content: interrupted_message(&call.name),
            is_error: false,
        }
    }
}

pub fn interrupted_message(tool_name: &str) -> String {
    format!("Tool interrupted: `{}`, user stopped the execution", tool_name)
}

/// Backend-independent view of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnView {
    pub role: TurnRole,
    pub tool_calls: Vec<ToolCallRef>,
    pub tool_results: Vec<ToolResult>,
    pub text: Option<String>,
}

impl TurnView {
    pub fn new(role: TurnRole) -> Self {
        Self {
            role,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            text: None,
        }
    }

    /// This turn carries a result for the call `id`.
    pub fn answers(&self, id: &str) -> bool {
        self.tool_results.iter().any(|r| r.tool_use_id == id)
    }
}

/// Translation between a backend's native turns and [`TurnView`].
pub trait ConversationFormat: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn view(&self, turn: &Value) -> TurnView;

    /// Native turns replacing `turn`, with `results` placed in front of its
    /// own content. Results keep the given order.
    fn insert_results_before(&self, turn: &Value, results: &[ToolResult]) -> Vec<Value>;

    /// Native turns carrying only `results`, appended after a trailing orphan.
    fn results_turns(&self, results: &[ToolResult]) -> Vec<Value>;
}

/// Repair a native turn list. Consistent input comes back unchanged.
pub fn repair_turns<F>(format: &F, turns: &[Value]) -> Vec<Value>
where
    F: ConversationFormat + ?Sized,
{
    repair_counting(format, turns).0
}

/// Repair an opaque conversation value. Non-array values are returned as-is.
pub fn repair_conversation<F>(format: &F, conversation: &Value) -> Value
where
    F: ConversationFormat + ?Sized,
{
    repair_if_needed(format, conversation).unwrap_or_else(|| conversation.clone())
}

/// Repaired copy of `conversation`, or `None` when nothing was orphaned.
pub fn repair_if_needed<F>(format: &F, conversation: &Value) -> Option<Value>
where
    F: ConversationFormat + ?Sized,
{
    let turns = conversation.as_array()?;
    let (repaired, synthesized) = repair_counting(format, turns);
    if synthesized == 0 {
        return None;
    }
    debug!(
        format = format.name(),
        synthesized, "synthesized results for interrupted tool calls"
    );
    Some(Value::Array(repaired))
}

/// Tool calls that have no result before the next non-tool turn, in call order.
pub fn orphaned_tool_calls<F>(format: &F, turns: &[Value]) -> Vec<ToolCallRef>
where
    F: ConversationFormat + ?Sized,
{
    let mut orphans = Vec::new();
    let mut pending: Vec<ToolCallRef> = Vec::new();
    for turn in turns {
        let view = format.view(turn);
        settle(&mut pending, &view.tool_results);
        if view.role != TurnRole::Tool {
            orphans.append(&mut pending);
        }
        pending.extend(view.tool_calls);
    }
    orphans.append(&mut pending);
    orphans
}

fn repair_counting<F>(format: &F, turns: &[Value]) -> (Vec<Value>, usize)
where
    F: ConversationFormat + ?Sized,
{
    let mut repaired = Vec::with_capacity(turns.len());
    let mut pending: Vec<ToolCallRef> = Vec::new();
    let mut synthesized = 0;

    for turn in turns {
        let view = format.view(turn);
        settle(&mut pending, &view.tool_results);

        if view.role == TurnRole::Tool || pending.is_empty() {
            repaired.push(turn.clone());
        } else {
            let results: Vec<ToolResult> = pending.drain(..).map(|c| ToolResult::interrupted(&c)).collect();
            synthesized += results.len();
            repaired.extend(format.insert_results_before(turn, &results));
        }

        pending.extend(view.tool_calls);
    }

    if !pending.is_empty() {
        let results: Vec<ToolResult> = pending.iter().map(ToolResult::interrupted).collect();
        synthesized += results.len();
        repaired.extend(format.results_turns(&results));
    }

    (repaired, synthesized)
}

/// Each result answers the earliest pending call with its id. Calls that share
/// an id (Gemini calls without ids share the function name) stay pending one
/// occurrence per call.
fn settle(pending: &mut Vec<ToolCallRef>, results: &[ToolResult]) {
    for result in results {
        if let Some(pos) = pending.iter().position(|c| c.id == result.tool_use_id) {
            pending.remove(pos);
        }
    }
}

/// New conversation made of `conversation`'s turns followed by `turns`.
///
/// A missing or non-array conversation starts empty. The input is not touched.
pub fn append_turns<I>(conversation: Option<&Value>, turns: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut out: Vec<Value> = conversation
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    out.extend(turns);
    Value::Array(out)
}

/// Text of a string or of `{type: "text", text}` / `{text}` parts.
pub(crate) fn collect_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join(""))
            }
        }
        _ => None,
    }
}

//! Default prompt formatting.
//!
//! Backends normally build their own native prompt. Drivers that do not
//! override `format_prompt` get this plain-text rendering.

use crate::types::{PromptRole, PromptSegment};

/// Render segments as one plain-text prompt.
///
/// System segments come first, then the dialogue in order, then safety
/// instructions. Negative and mask segments have no text form and are skipped.
pub fn format_text_prompt(segments: &[PromptSegment]) -> String {
    let mut system = Vec::new();
    let mut dialogue = Vec::new();
    let mut safety = Vec::new();

    for segment in segments {
        match segment.role {
            PromptRole::System => system.push(segment.content.clone()),
            PromptRole::User => dialogue.push(segment.content.clone()),
            PromptRole::Assistant => dialogue.push(format!("Assistant: {}", segment.content)),
            PromptRole::Tool => dialogue.push(match &segment.tool_use_id {
                Some(id) => format!("Tool result [{}]: {}", id, segment.content),
                None => format!("Tool result: {}", segment.content),
            }),
            PromptRole::Safety => safety.push(format!("IMPORTANT: {}", segment.content)),
            PromptRole::Negative | PromptRole::Mask => {}
        }
    }

    system
        .into_iter()
        .chain(dialogue)
        .chain(safety)
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! Model capability lookups.
//!
//! The lookup tables themselves live outside the core. Drivers hand an
//! oracle to the core, which only reads the tool-support flags to decide
//! whether a call can be streamed.

use crate::types::ExecutionOptions;
use serde::{Deserialize, Serialize};

/// Modalities supported on one side (input or output) of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalitySupport {
    pub text: bool,
    pub image: bool,
    pub video: bool,
    pub audio: bool,
    pub embed: bool,
}

impl ModalitySupport {
    pub fn text_only() -> Self {
        Self {
            text: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCapabilities {
    pub input: ModalitySupport,
    pub output: ModalitySupport,
    pub tool_support: bool,
    pub tool_support_streaming: bool,
}

impl ModelCapabilities {
    /// A text model supporting tools, streamed or not.
    pub fn text_with_tools() -> Self {
        Self {
            input: ModalitySupport::text_only(),
            output: ModalitySupport::text_only(),
            tool_support: true,
            tool_support_streaming: true,
        }
    }

    /// Produces images and no text.
    pub fn is_image_output(&self) -> bool {
        self.output.image && !self.output.text
    }
}

/// Static capability lookup for `(model, provider)`.
pub trait CapabilityOracle: Send + Sync {
    fn model_capabilities(&self, model: &str, provider: &str) -> ModelCapabilities;
}

impl<F> CapabilityOracle for F
where
    F: Fn(&str, &str) -> ModelCapabilities + Send + Sync,
{
    fn model_capabilities(&self, model: &str, provider: &str) -> ModelCapabilities {
        self(model, provider)
    }
}

/// Tools may be sent to this model.
pub fn supports_tools(caps: &ModelCapabilities, options: &ExecutionOptions) -> bool {
    !options.has_tools() || caps.tool_support
}

/// The call can use true streaming: either no tools are involved, or the
/// model supports tool calls while streaming.
pub fn can_stream_with_tools(caps: &ModelCapabilities, options: &ExecutionOptions) -> bool {
    !options.has_tools() || caps.tool_support_streaming
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolDefinition;

    fn with_tool() -> ExecutionOptions {
        ExecutionOptions::new("m").with_tools(vec![ToolDefinition::new(
            "search",
            serde_json::json!({"type": "object"}),
        )])
    }

    #[test]
    fn test_streaming_eligibility() {
        let caps = ModelCapabilities {
            tool_support: true,
            tool_support_streaming: false,
            ..ModelCapabilities::default()
        };
        assert!(supports_tools(&caps, &with_tool()));
        assert!(!can_stream_with_tools(&caps, &with_tool()));
        assert!(can_stream_with_tools(&caps, &ExecutionOptions::new("m")));
    }

    #[test]
    fn test_closure_oracle() {
        let oracle = |model: &str, _provider: &str| {
            if model.starts_with("imagen") {
                ModelCapabilities {
                    output: ModalitySupport {
                        image: true,
                        ..ModalitySupport::default()
                    },
                    ..ModelCapabilities::default()
                }
            } else {
                ModelCapabilities::text_with_tools()
            }
        };
        assert!(oracle.model_capabilities("imagen-3", "vertex").is_image_output());
        assert!(!oracle.model_capabilities("gemini", "vertex").is_image_output());
    }
}

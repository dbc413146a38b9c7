//! Core data model shared by drivers, streams and callers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PromptSegment`] | One turn fragment supplied by the caller |
//! | [`ExecutionOptions`] | Model, tools, conversation and result schema for one call |
//! | [`Completion`] | Finished response returned by a backend hook |
//! | [`CompletionChunk`] | Incremental fragment of a streaming response |
//! | [`ExecutionResponse`] | Completion plus prompt, timing and exchange id |
//! | [`ToolUse`] | Model-issued tool call |
//!
//! ```rust
//! use llumiverse::types::{ExecutionOptions, PromptSegment, ToolDefinition};
//!
//! let segments = vec![
//!     PromptSegment::system("You are a helpful assistant"),
//!     PromptSegment::user("What's the weather?"),
//! ];
//! let options = ExecutionOptions::new("claude-sonnet-4").with_tools(vec![
//!     ToolDefinition::new("get_weather", serde_json::json!({"type": "object"})),
//! ]);
//! assert!(options.has_tools());
//! assert_eq!(segments.len(), 2);
//! ```

pub mod completion;
pub mod model;
pub mod options;
pub mod segment;
pub mod tool;

pub use completion::{
    result_text, Completion, CompletionChunk, CompletionError, CompletionResult,
    ExecutionResponse, FinishReason, TokenUsage,
};
pub use model::{
    AIModel, EmbeddingsOptions, EmbeddingsResult, TrainingJob, TrainingJobStatus,
    TrainingOptions,
};
pub use options::{ExecutionOptions, Modality};
pub use segment::{FileSource, PromptFile, PromptRole, PromptSegment};
pub use tool::{ToolCallDelta, ToolDefinition, ToolUse};

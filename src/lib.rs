//! # llumiverse
//!
//! Provider-agnostic execution core for large-language-model drivers.
//!
//! Callers send prompt segments and get back a completion or a stream of
//! chunks, optionally with tool calls, whatever backend sits underneath.
//! Backends plug in by implementing the [`Driver`] hooks; the orchestration
//! around them is shared.
//!
//! ## Key Features
//!
//! - **One state machine**: [`DriverExt::execute`] and [`DriverExt::stream`]
//!   format the prompt, dispatch, validate and report timing the same way for
//!   every backend
//! - **Two stream strategies**: true incremental streaming, or a single
//!   blocking call replayed as one chunk when the model cannot stream
//! - **One error contract**: every failure becomes a [`LlumiverseError`] with a
//!   tri-state [`Retryable`] verdict and the provider, model, operation and
//!   prompt attached
//! - **Conversation repair**: tool calls left unanswered by an interrupted
//!   exchange get placeholder results before the next request
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use llumiverse::{DriverExt, ExecutionOptions, PromptSegment};
//!
//! let response = driver
//!     .execute(&[PromptSegment::user("Hello")], &ExecutionOptions::new("claude-sonnet-4"))
//!     .await?;
//! println!("{}", response.result_text());
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`driver`] | Driver hooks, orchestration, error classification, validation |
//! | [`stream`] | Completion streams and chunk accumulation |
//! | [`conversation`] | Orphaned tool call repair over native conversations |
//! | [`types`] | Prompt, options, completion and chunk types |
//! | [`error`] | Raw and normalized error types |
//! | [`error_code`] | Standard error categories |
//! | [`capabilities`] | Model capability lookups |
//! | [`retry`] | Retry policy over the tri-state verdict |
//! | [`registry`] | LRU driver cache with teardown |

pub mod capabilities;
pub mod conversation;
pub mod driver;
pub mod error;
pub mod error_code;
pub mod formatters;
pub mod registry;
pub mod retry;
pub mod stream;
pub mod types;

pub use capabilities::{CapabilityOracle, ModelCapabilities};
pub use conversation::{ConversationFormat, TurnRole, TurnView};
pub use driver::{Driver, DriverConfig, DriverExt};
pub use error::{Error, ErrorContext, LlumiverseError, ProviderError, Retryable};
pub use error_code::StandardErrorCode;
pub use registry::DriverCache;
pub use retry::RetryPolicy;
pub use stream::{CompletionStream, StreamStrategy};
pub use types::{
    Completion, CompletionChunk, CompletionResult, ExecutionOptions, ExecutionResponse,
    FinishReason, PromptRole, PromptSegment, TokenUsage, ToolDefinition, ToolUse,
};

use futures::Stream;
use std::pin::Pin;

/// Result type of backend hooks and helpers.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type of caller-facing driver operations.
pub type DriverResult<T> = std::result::Result<T, LlumiverseError>;

/// A pinned, boxed stream of fallible items.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

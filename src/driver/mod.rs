//! Driver contract and generic orchestration.
//!
//! A backend implements [`Driver`]: a fixed set of hooks (prompt formatting,
//! text completion, streaming, optional image generation and model
//! management). Callers use the [`DriverExt`] methods, which run the same
//! state machine for every backend:
//!
//! ```text
//! idle -> prompting -> dispatching -> validating -> complete
//!                                               \-> failed
//! ```
//!
//! Every failure is normalized into a [`LlumiverseError`](crate::LlumiverseError)
//! once, at the `execute`/`stream` boundary, with the provider, model,
//! operation and formatted prompt attached.

pub mod config;
pub(crate) mod core;
pub mod error_classification;
pub mod validation;

pub use self::core::DriverExt;
pub use config::DriverConfig;
pub use error_classification::{
    classify_error, error_name, extract_status_code, format_llumiverse_error,
    format_llumiverse_error_with, is_retryable_error,
};
pub use validation::{validate_completion, validate_result};

use crate::capabilities::{can_stream_with_tools, CapabilityOracle};
use crate::conversation::ConversationFormat;
use crate::error::{Error, Retryable};
use crate::formatters::format_text_prompt;
use crate::types::{
    AIModel, Completion, CompletionChunk, CompletionResult, EmbeddingsOptions, EmbeddingsResult,
    ExecutionOptions, Modality, PromptFile, PromptSegment, ToolUse, TrainingJob, TrainingOptions,
};
use crate::{BoxStream, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Backend hooks.
///
/// Only [`provider`](Driver::provider), [`request_text_completion`](Driver::request_text_completion)
/// and [`request_text_completion_stream`](Driver::request_text_completion_stream)
/// are required. Everything else has a default.
///
/// A driver holds no per-exchange state, so one instance can serve concurrent
/// exchanges.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Backend-native prompt. `From<String>` lets the plain-text formatter
    /// build one when [`format_prompt`](Driver::format_prompt) is not overridden.
    type Prompt: Clone + Serialize + From<String> + Send + Sync + 'static;

    /// Provider identifier, e.g. `"anthropic"` or `"bedrock"`.
    fn provider(&self) -> &str;

    fn config(&self) -> &DriverConfig {
        &DriverConfig::DEFAULT
    }

    /// Parent span of every exchange run by this driver.
    fn logger(&self) -> tracing::Span {
        tracing::Span::none()
    }

    fn capabilities(&self) -> Option<&dyn CapabilityOracle> {
        None
    }

    /// Native conversation shape, enabling repair of interrupted tool calls.
    fn conversation_format(&self) -> Option<&dyn ConversationFormat> {
        None
    }

    /// Image models go through [`request_image_generation`](Driver::request_image_generation)
    /// and are never truly streamed.
    fn is_image_model(&self, options: &ExecutionOptions) -> bool {
        if options.output_modality == Some(Modality::Image) {
            return true;
        }
        self.capabilities()
            .map(|oracle| {
                oracle
                    .model_capabilities(&options.model, self.provider())
                    .is_image_output()
            })
            .unwrap_or(false)
    }

    /// Whether this call can use true streaming. Without a capability oracle
    /// every call is assumed streamable.
    async fn can_stream(&self, options: &ExecutionOptions) -> bool {
        match self.capabilities() {
            Some(oracle) => {
                let caps = oracle.model_capabilities(&options.model, self.provider());
                can_stream_with_tools(&caps, options)
            }
            None => true,
        }
    }

    /// Retry verdict for a raw error. Override to consult SDK-specific error
    /// types before the default heuristic.
    fn is_retryable_error(&self, error: &Error) -> Retryable {
        classify_error(error)
    }

    async fn format_prompt(
        &self,
        segments: &[PromptSegment],
        _options: &ExecutionOptions,
    ) -> Result<Self::Prompt> {
        Ok(format_text_prompt(segments).into())
    }

    async fn request_text_completion(
        &self,
        prompt: &Self::Prompt,
        options: &ExecutionOptions,
    ) -> Result<Completion>;

    /// Native chunk sequence. Dropping the stream must stop the backend request.
    async fn request_text_completion_stream(
        &self,
        prompt: &Self::Prompt,
        options: &ExecutionOptions,
    ) -> Result<BoxStream<'static, CompletionChunk>>;

    async fn request_image_generation(
        &self,
        _prompt: &Self::Prompt,
        _options: &ExecutionOptions,
    ) -> Result<Completion> {
        Err(Error::NotImplemented("request_image_generation"))
    }

    /// Conversation to hand back after a streamed exchange, built from what
    /// the stream accumulated. `None` when the backend cannot rebuild one.
    fn build_streaming_conversation(
        &self,
        _prompt: &Self::Prompt,
        _result: &[CompletionResult],
        _tool_use: &[ToolUse],
        _options: &ExecutionOptions,
    ) -> Option<Value> {
        None
    }

    async fn list_models(&self) -> Result<Vec<AIModel>> {
        Err(Error::NotImplemented("list_models"))
    }

    async fn validate_connection(&self) -> Result<bool> {
        Err(Error::NotImplemented("validate_connection"))
    }

    async fn generate_embeddings(&self, _options: &EmbeddingsOptions) -> Result<EmbeddingsResult> {
        Err(Error::NotImplemented("generate_embeddings"))
    }

    async fn create_training_prompt(
        &self,
        _segments: &[PromptSegment],
        _options: &ExecutionOptions,
    ) -> Result<String> {
        Err(Error::NotImplemented("create_training_prompt"))
    }

    async fn start_training(
        &self,
        _dataset: &PromptFile,
        _options: &TrainingOptions,
    ) -> Result<TrainingJob> {
        Err(Error::NotImplemented("start_training"))
    }

    async fn cancel_training(&self, _job_id: &str) -> Result<TrainingJob> {
        Err(Error::NotImplemented("cancel_training"))
    }

    async fn get_training_job(&self, _job_id: &str) -> Result<TrainingJob> {
        Err(Error::NotImplemented("get_training_job"))
    }

    /// Release live resources. Called by [`DriverCache`](crate::registry::DriverCache)
    /// when the driver is evicted.
    async fn destroy(&self) {}
}

use crate::conversation::repair_if_needed;
use crate::driver::validation::validate_completion;
use crate::driver::{format_llumiverse_error_with, Driver};
use crate::error::{Error, ErrorContext, LlumiverseError};
use crate::stream::{CompletionStream, StreamStrategy};
use crate::types::{Completion, ExecutionOptions, ExecutionResponse, PromptSegment};
use crate::{DriverResult, Result};
use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Caller-facing operations, available on every [`Driver`].
#[async_trait]
pub trait DriverExt: Driver {
    /// Run one blocking exchange.
    ///
    /// Tool calls and schema mismatches are not failures: the first comes back
    /// in `tool_use`, the second in `completion.error`.
    async fn execute(
        &self,
        segments: &[PromptSegment],
        options: &ExecutionOptions,
    ) -> DriverResult<ExecutionResponse>;

    /// Start a streamed exchange.
    ///
    /// Image models, and calls for which [`Driver::can_stream`] says no, get the
    /// fallback strategy: one blocking call replayed as a single chunk.
    async fn stream<'a>(
        &'a self,
        segments: &[PromptSegment],
        options: &ExecutionOptions,
    ) -> DriverResult<CompletionStream<'a, Self>>;
}

#[async_trait]
impl<D: Driver + ?Sized> DriverExt for D {
    async fn execute(
        &self,
        segments: &[PromptSegment],
        options: &ExecutionOptions,
    ) -> DriverResult<ExecutionResponse> {
        let exchange = Exchange::start(self, &options.model, "execute");
        let span = exchange.span.clone();
        async move {
            let options = prepare_options(self, options);
            let prompt = self
                .format_prompt(segments, &options)
                .await
                .map_err(|e| exchange.fail(self, e, None))?;

            match execute_prompt(self, &prompt, &options).await {
                Ok(completion) => Ok(exchange.respond(self, completion, &prompt, &options)),
                Err(e) => Err(exchange.fail(self, e, Some(&prompt))),
            }
        }
        .instrument(span)
        .await
    }

    async fn stream<'a>(
        &'a self,
        segments: &[PromptSegment],
        options: &ExecutionOptions,
    ) -> DriverResult<CompletionStream<'a, Self>> {
        let exchange = Exchange::start(self, &options.model, "stream");
        let span = exchange.span.clone();
        async move {
            let options = prepare_options(self, options).into_owned();
            let prompt = self
                .format_prompt(segments, &options)
                .await
                .map_err(|e| exchange.fail(self, e, None))?;

            let strategy = if self.is_image_model(&options) {
                StreamStrategy::Fallback
            } else if self.can_stream(&options).await {
                StreamStrategy::Default
            } else {
                StreamStrategy::Fallback
            };
            debug!(?strategy, "stream strategy selected");

            match strategy {
                StreamStrategy::Default => {
                    match self.request_text_completion_stream(&prompt, &options).await {
                        Ok(chunks) => Ok(CompletionStream::streaming(
                            self, prompt, options, exchange, chunks,
                        )),
                        Err(e) => Err(exchange.fail(self, e, Some(&prompt))),
                    }
                }
                StreamStrategy::Fallback => {
                    Ok(CompletionStream::fallback(self, prompt, options, exchange))
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Dispatch a formatted prompt and post-process the completion.
pub(crate) async fn execute_prompt<D>(
    driver: &D,
    prompt: &D::Prompt,
    options: &ExecutionOptions,
) -> Result<Completion>
where
    D: Driver + ?Sized,
{
    if driver.is_image_model(options) {
        debug!("dispatching image generation");
        let mut completion = driver.request_image_generation(prompt, options).await?;
        completion.normalize_finish_reason();
        return Ok(completion);
    }

    let mut completion = driver.request_text_completion(prompt, options).await?;
    finalize_completion(driver, &mut completion, options);
    Ok(completion)
}

/// Enforce the tool-use finish reason and run schema validation, unless the
/// completion is a tool call or already failed.
pub(crate) fn finalize_completion<D>(driver: &D, completion: &mut Completion, options: &ExecutionOptions)
where
    D: Driver + ?Sized,
{
    completion.normalize_finish_reason();
    if completion.has_tool_use() || completion.error.is_some() || !driver.config().validate_results {
        return;
    }
    validate_completion(completion, options.result_schema.as_ref());
    if let Some(error) = &completion.error {
        warn!(message = %error.message, "result failed schema validation");
    }
}

/// Options with the conversation repaired, borrowed when nothing changed.
fn prepare_options<'o, D>(driver: &D, options: &'o ExecutionOptions) -> Cow<'o, ExecutionOptions>
where
    D: Driver + ?Sized,
{
    if !driver.config().repair_conversations {
        return Cow::Borrowed(options);
    }
    let repaired = driver
        .conversation_format()
        .zip(options.conversation.as_ref())
        .and_then(|(format, conversation)| repair_if_needed(format, conversation));

    match repaired {
        Some(conversation) => {
            let mut owned = options.clone();
            owned.conversation = Some(conversation);
            Cow::Owned(owned)
        }
        None => Cow::Borrowed(options),
    }
}

/// Identity and timing of one exchange.
#[derive(Debug, Clone)]
pub(crate) struct Exchange {
    pub(crate) provider: String,
    pub(crate) model: String,
    pub(crate) operation: &'static str,
    pub(crate) id: String,
    pub(crate) started: Instant,
    pub(crate) span: Span,
}

impl Exchange {
    pub(crate) fn start<D>(driver: &D, model: &str, operation: &'static str) -> Self
    where
        D: Driver + ?Sized,
    {
        let id = Uuid::new_v4().to_string();
        let parent = driver.logger();
        let span = if parent.is_none() {
            info_span!(
                "llumiverse.exchange",
                provider = driver.provider(),
                model = model,
                operation = operation,
                exchange_id = %id,
            )
        } else {
            info_span!(
                parent: &parent,
                "llumiverse.exchange",
                provider = driver.provider(),
                model = model,
                operation = operation,
                exchange_id = %id,
            )
        };
        Self {
            provider: driver.provider().to_string(),
            model: model.to_string(),
            operation,
            id,
            started: Instant::now(),
            span,
        }
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Normalize a failure of this exchange. Already normalized errors pass
    /// through untouched.
    pub(crate) fn fail<D>(&self, driver: &D, error: Error, prompt: Option<&D::Prompt>) -> LlumiverseError
    where
        D: Driver + ?Sized,
    {
        let retryable = match &error {
            Error::Normalized(e) => e.retryable,
            other => driver.is_retryable_error(other),
        };

        let mut context = ErrorContext::new(&self.provider, &self.model, self.operation);
        if driver.config().attach_prompt_to_errors {
            if let Some(prompt) = prompt.and_then(|p| serde_json::to_value(p).ok()) {
                context = context.with_prompt(prompt);
            }
        }

        let error = format_llumiverse_error_with(error, context, retryable);
        warn!(
            parent: &self.span,
            code = ?error.code,
            name = ?error.name,
            standard_code = %error.standard_code,
            retryable = %error.retryable,
            elapsed_ms = self.elapsed_ms(),
            "exchange failed: {}",
            error.message
        );
        error
    }

    /// Drop the raw backend response unless requested.
    pub(crate) fn strip_original<D>(&self, driver: &D, completion: &mut Completion, options: &ExecutionOptions)
    where
        D: Driver + ?Sized,
    {
        let include = options
            .include_original_response
            .unwrap_or(driver.config().include_original_response);
        if !include {
            completion.original_response = None;
        }
    }

    fn respond<D>(
        &self,
        driver: &D,
        mut completion: Completion,
        prompt: &D::Prompt,
        options: &ExecutionOptions,
    ) -> ExecutionResponse
    where
        D: Driver + ?Sized,
    {
        self.strip_original(driver, &mut completion, options);
        let execution_time_ms = self.elapsed_ms();
        info!(
            execution_time_ms,
            finish_reason = completion.finish_reason.as_ref().map(|r| r.as_str()),
            tool_calls = completion.tool_use.len(),
            "exchange complete"
        );
        ExecutionResponse {
            completion,
            prompt: serde_json::to_value(prompt).ok(),
            execution_time_ms,
            exchange_id: self.id.clone(),
        }
    }
}

//! Streamed exchanges.
//!
//! A [`CompletionStream`] yields [`CompletionChunk`]s and, once exhausted,
//! exposes the final [`Completion`]. Two strategies sit behind it:
//!
//! - [`StreamStrategy::Default`] pulls the backend's native chunk sequence one
//!   item at a time and accumulates text and tool-call fragments.
//! - [`StreamStrategy::Fallback`] performs one blocking call on first poll and
//!   yields the whole result as a single chunk.
//!
//! There is no cancel operation: dropping the stream drops the backend
//! sequence, which ends the underlying request.

pub mod accumulate;

pub use accumulate::{Accumulated, ChunkAccumulator, ToolCallAssembler};

use crate::driver::core::{execute_prompt, finalize_completion, Exchange};
use crate::driver::Driver;
use crate::types::{Completion, CompletionChunk, ExecutionOptions};
use crate::{BoxStream, DriverResult, Result};
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStrategy {
    /// True incremental streaming from the backend.
    Default,
    /// One blocking call replayed as a single chunk.
    Fallback,
}

enum State<'a> {
    Streaming(BoxStream<'static, CompletionChunk>),
    Executing(BoxFuture<'a, Result<Completion>>),
    Done,
}

/// Chunks of one exchange, then its final completion.
///
/// ```rust,ignore
/// let mut stream = driver.stream(&segments, &options).await?;
/// while let Some(chunk) = stream.next().await {
///     print!("{}", result_text(&chunk?.result));
/// }
/// let completion = stream.into_completion();
/// ```
pub struct CompletionStream<'a, D: Driver + ?Sized> {
    driver: &'a D,
    prompt: Arc<D::Prompt>,
    options: Arc<ExecutionOptions>,
    exchange: Exchange,
    strategy: StreamStrategy,
    state: State<'a>,
    accumulator: ChunkAccumulator,
    completion: Option<Completion>,
}

impl<'a, D: Driver + ?Sized> CompletionStream<'a, D> {
    pub(crate) fn streaming(
        driver: &'a D,
        prompt: D::Prompt,
        options: ExecutionOptions,
        exchange: Exchange,
        chunks: BoxStream<'static, CompletionChunk>,
    ) -> Self {
        Self {
            driver,
            prompt: Arc::new(prompt),
            options: Arc::new(options),
            exchange,
            strategy: StreamStrategy::Default,
            state: State::Streaming(chunks),
            accumulator: ChunkAccumulator::new(),
            completion: None,
        }
    }

    pub(crate) fn fallback(
        driver: &'a D,
        prompt: D::Prompt,
        options: ExecutionOptions,
        exchange: Exchange,
    ) -> Self {
        let prompt = Arc::new(prompt);
        let options = Arc::new(options);
        let call = {
            let prompt = Arc::clone(&prompt);
            let options = Arc::clone(&options);
            Box::pin(async move { execute_prompt(driver, &*prompt, &*options).await })
        };
        Self {
            driver,
            prompt,
            options,
            exchange,
            strategy: StreamStrategy::Fallback,
            state: State::Executing(call),
            accumulator: ChunkAccumulator::new(),
            completion: None,
        }
    }

    pub fn strategy(&self) -> StreamStrategy {
        self.strategy
    }

    pub fn exchange_id(&self) -> &str {
        &self.exchange.id
    }

    /// Final completion, available once the stream is exhausted.
    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn into_completion(self) -> Option<Completion> {
        self.completion
    }

    /// Drain the stream and return the final completion.
    pub async fn collect_completion(mut self) -> DriverResult<Completion> {
        while let Some(chunk) = self.next().await {
            chunk?;
        }
        Ok(self.completion.unwrap_or_default())
    }

    fn finish_default(&mut self) -> Completion {
        let accumulated = std::mem::take(&mut self.accumulator).finish();
        let conversation = self.driver.build_streaming_conversation(
            &self.prompt,
            &accumulated.result,
            &accumulated.tool_use,
            &self.options,
        );
        let mut completion = Completion {
            result: accumulated.result,
            tool_use: accumulated.tool_use,
            finish_reason: accumulated.finish_reason,
            token_usage: accumulated.token_usage,
            conversation,
            ..Completion::default()
        };
        finalize_completion(self.driver, &mut completion, &self.options);
        completion
    }

    fn complete(&mut self, mut completion: Completion) {
        self.exchange
            .strip_original(self.driver, &mut completion, &self.options);
        let _guard = self.exchange.span.enter();
        info!(
            execution_time_ms = self.exchange.elapsed_ms(),
            finish_reason = completion.finish_reason.as_ref().map(|r| r.as_str()),
            tool_calls = completion.tool_use.len(),
            "stream complete"
        );
        self.completion = Some(completion);
        self.state = State::Done;
    }
}

impl<'a, D: Driver + ?Sized> Stream for CompletionStream<'a, D> {
    type Item = DriverResult<CompletionChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match &mut this.state {
            State::Streaming(chunks) => match ready!(chunks.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.accumulator.push(&chunk);
                    Poll::Ready(Some(Ok(chunk)))
                }
                Some(Err(e)) => {
                    this.state = State::Done;
                    let error = this.exchange.fail(this.driver, e, Some(this.prompt.as_ref()));
                    Poll::Ready(Some(Err(error)))
                }
                None => {
                    let completion = this.finish_default();
                    this.complete(completion);
                    Poll::Ready(None)
                }
            },
            State::Executing(call) => match ready!(call.as_mut().poll(cx)) {
                Ok(completion) => {
                    let chunk = CompletionChunk::from(&completion);
                    this.complete(completion);
                    Poll::Ready(Some(Ok(chunk)))
                }
                Err(e) => {
                    this.state = State::Done;
                    let error = this.exchange.fail(this.driver, e, Some(this.prompt.as_ref()));
                    Poll::Ready(Some(Err(error)))
                }
            },
            State::Done => Poll::Ready(None),
        }
    }
}

impl<'a, D: Driver + ?Sized> fmt::Debug for CompletionStream<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Streaming(_) => "streaming",
            State::Executing(_) => "executing",
            State::Done => "done",
        };
        f.debug_struct("CompletionStream")
            .field("provider", &self.exchange.provider)
            .field("model", &self.exchange.model)
            .field("strategy", &self.strategy)
            .field("state", &state)
            .field("chunks", &self.accumulator.chunk_count())
            .finish()
    }
}

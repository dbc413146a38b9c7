//! Scripted driver shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, Stream};
use llumiverse::capabilities::{CapabilityOracle, ModelCapabilities};
use llumiverse::conversation::{append_turns, ConversationFormat};
use llumiverse::types::{CompletionResult, ToolUse};
use llumiverse::{
    BoxStream, Completion, CompletionChunk, Driver, DriverConfig, Error, ExecutionOptions,
    Result, Retryable,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

type CompletionFactory = Box<dyn Fn() -> Result<Completion> + Send + Sync>;
type ChunkFactory = Box<dyn Fn() -> Vec<Result<CompletionChunk>> + Send + Sync>;

#[derive(Debug, Default)]
pub struct Calls {
    pub text: AtomicUsize,
    pub stream: AtomicUsize,
    pub image: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub native_streams_dropped: AtomicUsize,
}

impl Calls {
    pub fn text(&self) -> usize {
        self.text.load(Ordering::SeqCst)
    }

    pub fn stream(&self) -> usize {
        self.stream.load(Ordering::SeqCst)
    }

    pub fn image(&self) -> usize {
        self.image.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn native_streams_dropped(&self) -> usize {
        self.native_streams_dropped.load(Ordering::SeqCst)
    }
}

/// Backend chunk stream that records when it is dropped.
struct TrackedStream {
    inner: BoxStream<'static, CompletionChunk>,
    calls: Arc<Calls>,
}

impl Stream for TrackedStream {
    type Item = Result<CompletionChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.calls.native_streams_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// A driver whose hooks replay canned completions and chunks.
pub struct MockDriver {
    pub config: DriverConfig,
    pub calls: Arc<Calls>,
    pub seen_conversation: Mutex<Option<Value>>,
    completion: CompletionFactory,
    chunks: ChunkFactory,
    image: Option<Completion>,
    streamable: bool,
    verdict: Option<Retryable>,
    format: Option<Box<dyn ConversationFormat>>,
    oracle: Option<Box<dyn CapabilityOracle>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            config: DriverConfig::default(),
            calls: Arc::new(Calls::default()),
            seen_conversation: Mutex::new(None),
            completion: Box::new(|| Ok(Completion::text("Hello"))),
            chunks: Box::new(|| {
                vec![
                    Ok(CompletionChunk::text("Hel")),
                    Ok(CompletionChunk::text("lo")),
                    Ok(CompletionChunk::finish(llumiverse::FinishReason::Stop, None)),
                ]
            }),
            image: None,
            streamable: true,
            verdict: None,
            format: None,
            oracle: None,
        }
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = Box::new(move || Ok(completion.clone()));
        self
    }

    pub fn failing<F>(mut self, error: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        self.completion = Box::new(move || Err(error()));
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<CompletionChunk>) -> Self {
        self.chunks = Box::new(move || chunks.iter().cloned().map(Ok).collect());
        self
    }

    pub fn with_chunk_script<F>(mut self, script: F) -> Self
    where
        F: Fn() -> Vec<Result<CompletionChunk>> + Send + Sync + 'static,
    {
        self.chunks = Box::new(script);
        self
    }

    pub fn with_image(mut self, completion: Completion) -> Self {
        self.image = Some(completion);
        self
    }

    pub fn not_streamable(mut self) -> Self {
        self.streamable = false;
        self
    }

    pub fn with_verdict(mut self, verdict: Retryable) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn with_format<F: ConversationFormat + 'static>(mut self, format: F) -> Self {
        self.format = Some(Box::new(format));
        self
    }

    pub fn with_oracle<O: CapabilityOracle + 'static>(mut self, oracle: O) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seen_conversation(&self) -> Option<Value> {
        self.seen_conversation.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Prompt = String;

    fn provider(&self) -> &str {
        "mock"
    }

    fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn capabilities(&self) -> Option<&dyn CapabilityOracle> {
        self.oracle.as_deref()
    }

    fn conversation_format(&self) -> Option<&dyn ConversationFormat> {
        self.format.as_deref()
    }

    async fn can_stream(&self, options: &ExecutionOptions) -> bool {
        if !self.streamable {
            return false;
        }
        match self.capabilities() {
            Some(oracle) => {
                let caps: ModelCapabilities = oracle.model_capabilities(&options.model, "mock");
                llumiverse::capabilities::can_stream_with_tools(&caps, options)
            }
            None => true,
        }
    }

    fn is_retryable_error(&self, error: &Error) -> Retryable {
        self.verdict
            .unwrap_or_else(|| llumiverse::driver::classify_error(error))
    }

    async fn request_text_completion(
        &self,
        _prompt: &String,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        self.calls.text.fetch_add(1, Ordering::SeqCst);
        *self.seen_conversation.lock().unwrap() = options.conversation.clone();
        (self.completion)()
    }

    async fn request_text_completion_stream(
        &self,
        _prompt: &String,
        options: &ExecutionOptions,
    ) -> Result<BoxStream<'static, CompletionChunk>> {
        self.calls.stream.fetch_add(1, Ordering::SeqCst);
        *self.seen_conversation.lock().unwrap() = options.conversation.clone();
        Ok(Box::pin(TrackedStream {
            inner: Box::pin(stream::iter((self.chunks)())),
            calls: Arc::clone(&self.calls),
        }))
    }

    async fn request_image_generation(
        &self,
        _prompt: &String,
        _options: &ExecutionOptions,
    ) -> Result<Completion> {
        self.calls.image.fetch_add(1, Ordering::SeqCst);
        self.image
            .clone()
            .ok_or(Error::NotImplemented("request_image_generation"))
    }

    fn build_streaming_conversation(
        &self,
        _prompt: &String,
        result: &[CompletionResult],
        _tool_use: &[ToolUse],
        options: &ExecutionOptions,
    ) -> Option<Value> {
        self.format.as_ref()?;
        Some(append_turns(
            options.conversation.as_ref(),
            vec![json!({
                "role": "assistant",
                "content": llumiverse::types::result_text(result),
            })],
        ))
    }

    async fn destroy(&self) {
        self.calls.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

mod common;

use common::{init_tracing, MockDriver};
use futures::StreamExt;
use llumiverse::conversation::{orphaned_tool_calls, AnthropicMessages};
use llumiverse::types::{CompletionResult, Modality, ToolCallDelta, ToolDefinition, ToolUse};
use llumiverse::{
    Completion, CompletionChunk, Driver, DriverConfig, DriverExt, Error, ErrorContext,
    ExecutionOptions, FinishReason, ModelCapabilities, PromptSegment, Retryable,
    StandardErrorCode, StreamStrategy,
};
use serde_json::json;

fn hello() -> Vec<PromptSegment> {
    vec![PromptSegment::user("Hello")]
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {"answer": {"type": "integer"}},
        "required": ["answer"],
    })
}

#[tokio::test]
async fn test_execute_returns_response_with_metadata() {
    init_tracing();
    let driver = MockDriver::new();
    let response = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();

    assert_eq!(response.result_text(), "Hello");
    assert_eq!(response.completion.finish_reason, Some(FinishReason::Stop));
    assert_eq!(response.prompt, Some(json!("Hello")));
    assert!(!response.exchange_id.is_empty());
    assert_eq!(driver.calls.text(), 1);
}

#[tokio::test]
async fn test_schema_mismatch_is_recorded_not_thrown() {
    let driver = MockDriver::new().with_completion(Completion::text("{\"answer\": \"lots\"}"));
    let options = ExecutionOptions::new("mock-1").with_result_schema(schema());
    let response = driver.execute(&hello(), &options).await.unwrap();

    let error = response.completion.error.as_ref().expect("validation error");
    assert!(error.is_validation_error());
    assert_eq!(response.result_text(), "{\"answer\": \"lots\"}");
}

#[tokio::test]
async fn test_valid_result_becomes_json() {
    let driver = MockDriver::new().with_completion(Completion::text("{\"answer\": 7}"));
    let options = ExecutionOptions::new("mock-1").with_result_schema(schema());
    let response = driver.execute(&hello(), &options).await.unwrap();

    assert!(response.completion.error.is_none());
    assert_eq!(
        response.completion.result,
        vec![CompletionResult::Json(json!({"answer": 7}))]
    );
}

#[tokio::test]
async fn test_validation_can_be_disabled() {
    let driver = MockDriver::new()
        .with_completion(Completion::text("not json"))
        .with_config(DriverConfig::default().with_validate_results(false));
    let options = ExecutionOptions::new("mock-1").with_result_schema(schema());
    let response = driver.execute(&hello(), &options).await.unwrap();
    assert!(response.completion.error.is_none());
}

#[tokio::test]
async fn test_tool_use_skips_validation_and_sets_finish_reason() {
    let completion = Completion {
        tool_use: vec![ToolUse::new("tool_1", "search", json!({"q": "rust"}))],
        finish_reason: Some(FinishReason::Stop),
        ..Completion::default()
    };
    let driver = MockDriver::new().with_completion(completion);
    let options = ExecutionOptions::new("mock-1").with_result_schema(schema());
    let response = driver.execute(&hello(), &options).await.unwrap();

    assert!(response.completion.error.is_none());
    assert_eq!(response.completion.finish_reason, Some(FinishReason::ToolUse));
}

#[tokio::test]
async fn test_failure_is_normalized_with_context() {
    let driver = MockDriver::new().failing(|| Error::http(429, "Too many requests"));
    let error = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap_err();

    assert_eq!(error.retryable, Retryable::Yes);
    assert_eq!(error.code, Some(429));
    assert_eq!(error.standard_code, StandardErrorCode::RateLimited);
    assert_eq!(error.context.provider, "mock");
    assert_eq!(error.context.model, "mock-1");
    assert_eq!(error.context.operation, "execute");
    assert_eq!(error.context.prompt, Some(json!("Hello")));
    assert_eq!(error.message, "Too many requests");
}

#[tokio::test]
async fn test_unknown_and_permanent_verdicts() {
    let driver = MockDriver::new().failing(|| Error::http(401, "bad key"));
    let error = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap_err();
    assert_eq!(error.retryable, Retryable::No);

    let driver = MockDriver::new()
        .failing(|| Error::Other(anyhow::anyhow!("unexpected failure")));
    let error = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap_err();
    assert_eq!(error.retryable, Retryable::Unknown);
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_driver_verdict_override() {
    let driver = MockDriver::new()
        .failing(|| Error::http(400, "invalid_request_error"))
        .with_verdict(Retryable::Yes);
    let error = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap_err();
    assert_eq!(error.retryable, Retryable::Yes);
}

#[tokio::test]
async fn test_prompt_not_attached_when_disabled() {
    let driver = MockDriver::new()
        .failing(|| Error::http(500, "boom"))
        .with_config(DriverConfig::default().with_attach_prompt_to_errors(false));
    let error = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap_err();
    assert!(error.context.prompt.is_none());
}

#[tokio::test]
async fn test_normalized_errors_are_not_wrapped_twice() {
    let driver = MockDriver::new().failing(|| {
        let upstream = llumiverse::driver::format_llumiverse_error(
            Error::http(503, "upstream down"),
            ErrorContext::new("upstream", "other-model", "execute"),
        );
        Error::from(upstream)
    });
    let error = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap_err();

    assert_eq!(error.context.provider, "upstream");
    assert_eq!(error.context.model, "other-model");
    assert!(matches!(*error.original, Error::Http { status: 503, .. }));
}

#[tokio::test]
async fn test_original_response_is_opt_in() {
    let completion = Completion {
        original_response: Some(json!({"raw": true})),
        ..Completion::text("Hello")
    };
    let driver = MockDriver::new().with_completion(completion);

    let response = driver
        .execute(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();
    assert!(response.completion.original_response.is_none());

    let options = ExecutionOptions::new("mock-1").include_original_response(true);
    let response = driver.execute(&hello(), &options).await.unwrap();
    assert_eq!(response.completion.original_response, Some(json!({"raw": true})));
}

#[tokio::test]
async fn test_image_models_use_image_hook() {
    let image = Completion {
        result: vec![CompletionResult::Image("https://img/1.png".into())],
        ..Completion::default()
    };
    let driver = MockDriver::new().with_image(image);
    let options = ExecutionOptions::new("imagen").with_output_modality(Modality::Image);
    let response = driver.execute(&hello(), &options).await.unwrap();

    assert_eq!(driver.calls.image(), 1);
    assert_eq!(driver.calls.text(), 0);
    assert_eq!(
        response.completion.result,
        vec![CompletionResult::Image("https://img/1.png".into())]
    );
}

#[tokio::test]
async fn test_default_stream_accumulates_chunks() {
    let driver = MockDriver::new();
    let mut stream = driver
        .stream(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();
    assert_eq!(stream.strategy(), StreamStrategy::Default);

    let mut texts = Vec::new();
    while let Some(chunk) = stream.next().await {
        texts.push(llumiverse::types::result_text(&chunk.unwrap().result));
    }
    assert_eq!(texts, vec!["Hel", "lo", ""]);

    let completion = stream.into_completion().unwrap();
    assert_eq!(completion.result_text(), "Hello");
    assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
    assert!(completion.conversation.is_none());
    assert_eq!(driver.calls.stream(), 1);
    assert_eq!(driver.calls.text(), 0);
}

#[tokio::test]
async fn test_default_stream_assembles_tool_calls() {
    let driver = MockDriver::new().with_chunks(vec![
        CompletionChunk::tool(ToolCallDelta::started("tool_1", "search")),
        CompletionChunk::tool(ToolCallDelta::fragment("tool_1", "{\"q\":")),
        CompletionChunk::tool(ToolCallDelta::fragment("tool_1", "\"rust\"}")),
        CompletionChunk::finish(FinishReason::Stop, None),
    ]);
    let completion = driver
        .stream(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap()
        .collect_completion()
        .await
        .unwrap();

    assert_eq!(
        completion.tool_use,
        vec![ToolUse::new("tool_1", "search", json!({"q": "rust"}))]
    );
    assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
}

#[tokio::test]
async fn test_streamed_result_is_validated() {
    let driver = MockDriver::new().with_chunks(vec![
        CompletionChunk::text("{\"answer\""),
        CompletionChunk::text(": 3}"),
    ]);
    let options = ExecutionOptions::new("mock-1").with_result_schema(schema());
    let completion = driver
        .stream(&hello(), &options)
        .await
        .unwrap()
        .collect_completion()
        .await
        .unwrap();
    assert_eq!(
        completion.result,
        vec![CompletionResult::Json(json!({"answer": 3}))]
    );
}

#[tokio::test]
async fn test_mid_stream_error_is_normalized() {
    let driver = MockDriver::new().with_chunk_script(|| {
        vec![
            Ok(CompletionChunk::text("partial")),
            Err(Error::http(529, "overloaded")),
            Ok(CompletionChunk::text("never seen")),
        ]
    });
    let mut stream = driver
        .stream(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();

    assert!(stream.next().await.unwrap().is_ok());
    let error = stream.next().await.unwrap().unwrap_err();
    assert_eq!(error.context.operation, "stream");
    assert_eq!(error.retryable, Retryable::Yes);
    assert_eq!(error.standard_code, StandardErrorCode::Overloaded);
    assert!(stream.next().await.is_none());
    assert!(stream.completion().is_none());
}

#[tokio::test]
async fn test_dropping_default_stream_releases_backend_stream() {
    let driver = MockDriver::new();
    let mut stream = driver
        .stream(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();
    assert_eq!(stream.strategy(), StreamStrategy::Default);

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.result, vec![CompletionResult::text("Hel")]);
    assert_eq!(driver.calls.native_streams_dropped(), 0);
    assert!(stream.completion().is_none());

    drop(stream);
    assert_eq!(driver.calls.native_streams_dropped(), 1);
    assert_eq!(driver.calls.stream(), 1);
    assert_eq!(driver.calls.text(), 0);
}

#[tokio::test]
async fn test_fallback_stream_matches_execute() {
    let completion = Completion {
        token_usage: Some(llumiverse::TokenUsage::new(4, 2)),
        ..Completion::text("Hello world")
    };
    let driver = MockDriver::new().with_completion(completion).not_streamable();
    let options = ExecutionOptions::new("mock-1");

    let executed = driver.execute(&hello(), &options).await.unwrap();

    let mut stream = driver.stream(&hello(), &options).await.unwrap();
    assert_eq!(stream.strategy(), StreamStrategy::Fallback);
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.unwrap());
    }

    assert_eq!(chunks.len(), 1);
    let streamed: Vec<CompletionResult> = chunks.into_iter().flat_map(|c| c.result).collect();
    assert_eq!(streamed, executed.completion.result);
    assert_eq!(stream.completion().unwrap().token_usage, executed.completion.token_usage);
    assert_eq!(driver.calls.stream(), 0);
    assert_eq!(driver.calls.text(), 2);
}

#[tokio::test]
async fn test_fallback_stream_error_surfaces_on_poll() {
    let driver = MockDriver::new()
        .failing(|| Error::http(503, "unavailable"))
        .not_streamable();
    let mut stream = driver
        .stream(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();
    let error = stream.next().await.unwrap().unwrap_err();
    assert_eq!(error.context.operation, "stream");
    assert!(error.is_retryable());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_image_models_never_truly_stream() {
    let image = Completion {
        result: vec![CompletionResult::Image("aGVsbG8=".into())],
        ..Completion::default()
    };
    let driver = MockDriver::new().with_image(image);
    let options = ExecutionOptions::new("imagen").with_output_modality(Modality::Image);
    let completion = driver
        .stream(&hello(), &options)
        .await
        .unwrap()
        .collect_completion()
        .await
        .unwrap();

    assert_eq!(completion.result, vec![CompletionResult::Image("aGVsbG8=".into())]);
    assert_eq!(driver.calls.stream(), 0);
    assert_eq!(driver.calls.image(), 1);
}

#[tokio::test]
async fn test_oracle_forces_fallback_for_tools_without_streaming_support() {
    let driver = MockDriver::new().with_oracle(|_: &str, _: &str| ModelCapabilities {
        tool_support: true,
        tool_support_streaming: false,
        ..ModelCapabilities::default()
    });
    let options = ExecutionOptions::new("mock-1")
        .with_tools(vec![ToolDefinition::new("search", json!({"type": "object"}))]);
    let stream = driver.stream(&hello(), &options).await.unwrap();
    assert_eq!(stream.strategy(), StreamStrategy::Fallback);

    let stream = driver
        .stream(&hello(), &ExecutionOptions::new("mock-1"))
        .await
        .unwrap();
    assert_eq!(stream.strategy(), StreamStrategy::Default);
}

#[tokio::test]
async fn test_conversation_is_repaired_before_dispatch() {
    let conversation = json!([
        {"role": "user", "content": "find docs"},
        {"role": "assistant", "content": [{"type": "tool_use", "id": "tool_1", "name": "search", "input": {}}]},
        {"role": "user", "content": "never mind"},
    ]);
    let driver = MockDriver::new().with_format(AnthropicMessages);
    let options = ExecutionOptions::new("mock-1").with_conversation(conversation.clone());
    driver.execute(&hello(), &options).await.unwrap();

    let seen = driver.seen_conversation().unwrap();
    assert!(orphaned_tool_calls(&AnthropicMessages, seen.as_array().unwrap()).is_empty());
    assert_eq!(seen[2]["content"][0]["tool_use_id"], "tool_1");
    assert_eq!(options.conversation, Some(conversation));
}

#[tokio::test]
async fn test_repair_can_be_disabled() {
    let conversation = json!([
        {"role": "assistant", "content": [{"type": "tool_use", "id": "tool_1", "name": "search", "input": {}}]},
    ]);
    let driver = MockDriver::new()
        .with_format(AnthropicMessages)
        .with_config(DriverConfig::default().with_repair_conversations(false));
    let options = ExecutionOptions::new("mock-1").with_conversation(conversation.clone());
    driver.execute(&hello(), &options).await.unwrap();
    assert_eq!(driver.seen_conversation(), Some(conversation));
}

#[tokio::test]
async fn test_streaming_conversation_hook() {
    let driver = MockDriver::new().with_format(AnthropicMessages);
    let options = ExecutionOptions::new("mock-1")
        .with_conversation(json!([{"role": "user", "content": "Hello"}]));
    let completion = driver
        .stream(&hello(), &options)
        .await
        .unwrap()
        .collect_completion()
        .await
        .unwrap();

    assert_eq!(
        completion.conversation,
        Some(json!([
            {"role": "user", "content": "Hello"},
            {"role": "assistant", "content": "Hello"},
        ]))
    );
}

#[tokio::test]
async fn test_optional_hooks_are_not_implemented() {
    let driver = MockDriver::new();
    assert!(matches!(
        driver.list_models().await,
        Err(Error::NotImplemented("list_models"))
    ));
    assert!(matches!(
        driver.cancel_training("job-1").await,
        Err(Error::NotImplemented(_))
    ));
}

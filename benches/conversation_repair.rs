//! Benchmarks for conversation repair and chunk accumulation
//!
//! This benchmark measures:
//! - Repair of consistent conversations (the common, no-op case)
//! - Repair of conversations with interrupted tool calls
//! - Text and tool call accumulation over a streamed response

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use llumiverse::conversation::{repair_turns, AnthropicMessages, OpenAiChat};
use llumiverse::stream::ChunkAccumulator;
use llumiverse::types::{CompletionChunk, ToolCallDelta};
use serde_json::{json, Value};

/// Anthropic-shaped history; every `orphan_every`-th tool call is left unanswered.
fn anthropic_history(exchanges: usize, orphan_every: usize) -> Vec<Value> {
    let mut turns = Vec::with_capacity(exchanges * 3);
    for i in 0..exchanges {
        let id = format!("toolu_{:04}", i);
        turns.push(json!({"role": "user", "content": format!("question {}", i)}));
        turns.push(json!({"role": "assistant", "content": [
            {"type": "text", "text": "Let me check."},
            {"type": "tool_use", "id": id, "name": "search", "input": {"q": i}}
        ]}));
        if orphan_every == 0 || i % orphan_every != 0 {
            turns.push(json!({"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": id, "content": "result"}
            ]}));
        }
    }
    turns
}

fn openai_history(exchanges: usize) -> Vec<Value> {
    let mut turns = Vec::with_capacity(exchanges * 3);
    for i in 0..exchanges {
        let id = format!("call_{}", i);
        turns.push(json!({"role": "user", "content": format!("question {}", i)}));
        turns.push(json!({"role": "assistant", "content": null, "tool_calls": [
            {"id": id, "type": "function", "function": {"name": "search", "arguments": "{}"}}
        ]}));
        if i % 2 == 0 {
            turns.push(json!({"role": "tool", "tool_call_id": id, "content": "result"}));
        }
    }
    turns
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversation_repair");

    for exchanges in [10usize, 100, 500] {
        let consistent = anthropic_history(exchanges, 0);
        group.throughput(Throughput::Elements(consistent.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("anthropic_consistent", exchanges),
            &consistent,
            |b, turns| b.iter(|| repair_turns(&AnthropicMessages, black_box(turns))),
        );

        let interrupted = anthropic_history(exchanges, 3);
        group.bench_with_input(
            BenchmarkId::new("anthropic_interrupted", exchanges),
            &interrupted,
            |b, turns| b.iter(|| repair_turns(&AnthropicMessages, black_box(turns))),
        );

        let openai = openai_history(exchanges);
        group.bench_with_input(
            BenchmarkId::new("openai_interrupted", exchanges),
            &openai,
            |b, turns| b.iter(|| repair_turns(&OpenAiChat, black_box(turns))),
        );
    }

    group.finish();
}

fn bench_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_accumulation");

    let text_chunks: Vec<CompletionChunk> = (0..1000)
        .map(|i| CompletionChunk::text(format!("token{} ", i)))
        .collect();
    group.throughput(Throughput::Elements(text_chunks.len() as u64));
    group.bench_function("text_1000_chunks", |b| {
        b.iter(|| {
            let mut acc = ChunkAccumulator::new();
            for chunk in black_box(&text_chunks) {
                acc.push(chunk);
            }
            acc.finish()
        })
    });

    let mut tool_chunks = vec![CompletionChunk::tool(ToolCallDelta::started("call_1", "get_weather"))];
    for fragment in ["{\"lo", "cation", "\": \"To", "kyo\"}"] {
        tool_chunks.push(CompletionChunk::tool(ToolCallDelta::fragment("call_1", fragment)));
    }
    group.bench_function("tool_call_fragments", |b| {
        b.iter(|| {
            let mut acc = ChunkAccumulator::new();
            for chunk in black_box(&tool_chunks) {
                acc.push(chunk);
            }
            acc.finish()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_repair, bench_accumulation);
criterion_main!(benches);

mod harness;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use harness::upstream::{MockUpstream, Reply};
use relay_llm::{LlmError, Message, Request, StreamChunk};
use serde_json::json;

fn slow_stream(count: usize) -> Reply {
    let payloads: Vec<_> = (0..count)
        .map(|i| json!({"id": "slow", "choices": [{"index": 0, "delta": {"content": format!("w{i} ")}}]}))
        .collect();
    Reply::sse(&payloads).delayed(Duration::from_millis(100))
}

fn text_stream(words: &[&str]) -> Reply {
    let payloads: Vec<_> = words
        .iter()
        .map(|word| json!({"id": "fast", "choices": [{"index": 0, "delta": {"content": word}}]}))
        .collect();
    Reply::sse(&payloads)
}

fn text(chunks: &[StreamChunk]) -> String {
    chunks.iter().filter_map(|c| c.delta.content.as_deref()).collect()
}

#[tokio::test]
async fn cancel_from_sink_stops_delivery_and_returns_ok() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post("/v1/chat/completions", slow_stream(50));

    let adapter = harness::adapter("openai", &upstream, "/v1");
    let request = Request::new("gpt-4o", vec![Message::user("count")]).streaming();

    let mut received = Vec::new();
    let started = Instant::now();
    let result = adapter
        .send_streaming(&request, &mut |chunk: StreamChunk| {
            received.push(chunk);
            adapter.cancel();
        })
        .await;

    result.unwrap();
    assert_eq!(received.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn cancel_from_another_task_ends_the_stream() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post("/v1/chat/completions", slow_stream(50));

    let adapter = harness::adapter("mistral", &upstream, "/v1");
    let canceller = Arc::clone(&adapter);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        canceller.cancel();
    });

    let request = Request::new("mistral-small-latest", vec![Message::user("count")]);
    let started = Instant::now();
    let (result, chunks) = harness::collect(adapter.as_ref(), &request).await;

    result.unwrap();
    assert!(!chunks.is_empty());
    assert!(chunks.len() < 50);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn cancelled_send_reports_cancelled() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/messages",
        Reply::json(json!({"id": "msg", "model": "m", "content": [], "stop_reason": "end_turn"}))
            .delayed(Duration::from_secs(10)),
    );

    let adapter = harness::adapter("anthropic", &upstream, "/v1");
    let canceller = Arc::clone(&adapter);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = adapter
        .send(&Request::new("claude-sonnet-4-5", vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Cancelled));
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn new_call_cancels_the_previous_one() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1beta/models/slow:generateContent",
        Reply::json(json!({"candidates": []})).delayed(Duration::from_secs(10)),
    );
    upstream.on_post(
        "/v1beta/models/fast:generateContent",
        Reply::json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "done"}]}, "finishReason": "STOP"}],
            "responseId": "fast-1"
        })),
    );

    let adapter = harness::adapter("gemini", &upstream, "/v1beta");
    let first = {
        let adapter = Arc::clone(&adapter);
        tokio::spawn(async move { adapter.send(&Request::new("slow", vec![Message::user("a")])).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = adapter
        .send(&Request::new("fast", vec![Message::user("b")]))
        .await
        .unwrap();

    assert_eq!(second.message.content, "done");
    let first = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("superseded call did not finish")
        .unwrap();
    assert!(matches!(first, Err(LlmError::Cancelled)));
}

#[tokio::test]
async fn cancel_without_a_call_is_harmless() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/api/v1/chat/completions",
        Reply::json(json!({
            "id": "gen-1",
            "model": "m",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "fine"}, "finish_reason": "stop"}]
        })),
    );

    let adapter = harness::adapter("openrouter", &upstream, "/api/v1");
    adapter.cancel();
    adapter.cancel();

    let response = adapter
        .send(&Request::new("openai/gpt-4o", vec![Message::user("hi")]))
        .await
        .unwrap();
    assert_eq!(response.message.content, "fine");
}

#[tokio::test]
async fn stream_after_cancel_runs_to_completion() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post("/v1/chat/completions", slow_stream(50));

    let adapter = harness::adapter("openai", &upstream, "/v1");
    let request = Request::new("gpt-4o", vec![Message::user("count")]).streaming();

    let mut first = 0;
    adapter
        .send_streaming(&request, &mut |_chunk: StreamChunk| {
            first += 1;
            adapter.cancel();
        })
        .await
        .unwrap();
    assert_eq!(first, 1);

    upstream.on_post("/v1/chat/completions", text_stream(&["one ", "two ", "three"]));
    let (result, chunks) = harness::collect(adapter.as_ref(), &request).await;

    result.unwrap();
    assert_eq!(text(&chunks), "one two three");
    assert_eq!(upstream.requests().len(), 2);
}

#[tokio::test]
async fn stream_after_failed_stream_succeeds() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/chat/completions",
        Reply::status(StatusCode::SERVICE_UNAVAILABLE, json!({"error": {"message": "try later"}})),
    );

    let adapter = harness::adapter("mistral", &upstream, "/v1");
    let request = Request::new("mistral-small-latest", vec![Message::user("hi")]);

    let (result, chunks) = harness::collect(adapter.as_ref(), &request).await;
    assert!(matches!(result, Err(LlmError::UpstreamTransport { .. })));
    assert!(chunks.is_empty());

    upstream.on_post("/v1/chat/completions", text_stream(&["back ", "again"]));
    let (result, chunks) = harness::collect(adapter.as_ref(), &request).await;

    result.unwrap();
    assert_eq!(text(&chunks), "back again");
}

#[tokio::test]
async fn stream_after_in_band_error_succeeds() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/chat/completions",
        Reply::sse(&[
            json!({"id": "s", "choices": [{"index": 0, "delta": {"content": "partial"}}]}),
            json!({"error": {"message": "server overloaded", "code": 503}}),
        ]),
    );

    let adapter = harness::adapter("openai", &upstream, "/v1");
    let request = Request::new("gpt-4o", vec![Message::user("hi")]);

    let (result, _) = harness::collect(adapter.as_ref(), &request).await;
    assert!(result.is_err());

    upstream.on_post("/v1/chat/completions", text_stream(&["recovered"]));
    let (result, chunks) = harness::collect(adapter.as_ref(), &request).await;

    result.unwrap();
    assert_eq!(text(&chunks), "recovered");
}

mod harness;

use axum::http::StatusCode;
use harness::upstream::{MockUpstream, Reply};
use relay_llm::types::FinishReason;
use relay_llm::{LlmError, Message, Request, ToolCall, ToolCallAssembler, ToolResult};
use serde_json::json;

#[tokio::test]
async fn send_maps_system_headers_and_blocks() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/messages",
        Reply::json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Oslo"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        })),
    );

    let adapter = harness::adapter("anthropic", &upstream, "/v1");
    let request = Request::new(
        "claude-sonnet-4-5",
        vec![Message::system("be brief"), Message::system("use metric units"), Message::user("weather?")],
    )
    .with_temperature(1.7);

    let response = adapter.send(&request).await.unwrap();
    assert_eq!(response.id, "msg_1");
    assert_eq!(response.message.content, "Let me check.");
    assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls[0].id, "toolu_1");
    assert_eq!(calls[0].arguments_value().unwrap(), json!({"city": "Oslo"}));

    let recorded = upstream.last_request();
    assert_eq!(recorded.headers["x-api-key"], "test-key");
    assert_eq!(recorded.headers["anthropic-version"], "2023-06-01");
    assert!(recorded.headers.get("authorization").is_none());

    assert_eq!(recorded.body["system"], "be brief\n\nuse metric units");
    assert_eq!(recorded.body["max_tokens"], 4096);
    assert_eq!(recorded.body["temperature"], 1.0);
    assert_eq!(recorded.body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tool_round_trip_is_sent_as_blocks() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/messages",
        Reply::json(json!({
            "id": "msg_2",
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": "It is 4 degrees."}],
            "stop_reason": "end_turn"
        })),
    );

    let adapter = harness::adapter("anthropic", &upstream, "/v1");
    let request = Request::new(
        "claude-sonnet-4-5",
        vec![
            Message::user("weather?"),
            Message::assistant("").with_tool_calls(vec![ToolCall::new("toolu_1", "get_weather", "{\"city\":\"Oslo\"}")]),
            Message::user("").with_tool_results(vec![ToolResult {
                tool_call_id: "toolu_1".to_owned(),
                name: Some("get_weather".to_owned()),
                content: "4C".to_owned(),
            }]),
        ],
    );

    let response = adapter.send(&request).await.unwrap();
    assert_eq!(response.finish_reason, Some(FinishReason::Stop));
    assert!(response.tool_calls.is_none());

    let messages = upstream.last_request().body["messages"].clone();
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"][0]["type"], "tool_use");
    assert_eq!(messages[1]["content"][0]["input"]["city"], "Oslo");
    assert_eq!(messages[2]["role"], "user");
    assert_eq!(messages[2]["content"][0]["type"], "tool_result");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
}

#[tokio::test]
async fn streaming_text_and_tool_use() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/messages",
        Reply::named_sse(&[
            json!({"type": "message_start", "message": {"id": "msg_s", "model": "claude-sonnet-4-5", "content": []}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "ping"}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Checking"}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " now."}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "content_block_start", "index": 1,
                   "content_block": {"type": "tool_use", "id": "toolu_s", "name": "get_weather", "input": {}}}),
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"city\":"}}),
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "\"Oslo\"}"}}),
            json!({"type": "content_block_stop", "index": 1}),
            json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 20}}),
            json!({"type": "message_stop"}),
        ]),
    );

    let adapter = harness::adapter("anthropic", &upstream, "/v1");
    let request = Request::new("claude-sonnet-4-5", vec![Message::user("weather?")]).streaming();
    let (result, chunks) = harness::collect(adapter.as_ref(), &request).await;
    result.unwrap();

    assert!(chunks.iter().all(|c| c.id == "msg_s"));

    let mut assembler = ToolCallAssembler::new("anthropic");
    for chunk in &chunks {
        assembler.push(chunk);
    }
    let assembled = assembler.finish().unwrap();
    assert_eq!(assembled.content, "Checking now.");
    assert_eq!(assembled.tool_calls.len(), 1);
    assert_eq!(assembled.tool_calls[0].id, "toolu_s");
    assert_eq!(assembled.tool_calls[0].name, "get_weather");
    assert_eq!(assembled.tool_calls[0].arguments_value().unwrap(), json!({"city": "Oslo"}));

    assert_eq!(upstream.last_request().body["stream"], true);
}

#[tokio::test]
async fn error_event_fails_the_stream() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_post(
        "/v1/messages",
        Reply::named_sse(&[
            json!({"type": "message_start", "message": {"id": "msg_e", "model": "claude-sonnet-4-5"}}),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        ]),
    );

    let adapter = harness::adapter("anthropic", &upstream, "/v1");
    let request = Request::new("claude-sonnet-4-5", vec![Message::user("hi")]);
    let (result, _) = harness::collect(adapter.as_ref(), &request).await;

    let err = result.unwrap_err();
    assert!(matches!(err, LlmError::UpstreamTransport { ref provider, .. } if provider == "anthropic"));
    assert!(err.to_string().contains("Overloaded"));
}

#[tokio::test]
async fn list_models_uses_display_names() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_get(
        "/v1/models",
        Reply::json(json!({
            "data": [{"type": "model", "id": "claude-new-1", "display_name": "Claude New"}],
            "has_more": false
        })),
    );

    let adapter = harness::adapter("claude", &upstream, "/v1");
    let models = adapter.list_models().await;

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "claude-new-1");
    assert_eq!(models[0].display_name, "Claude New");
    assert_eq!(models[0].provider, "anthropic");
    assert_eq!(upstream.last_request().query.as_deref(), Some("limit=1000"));
}

#[tokio::test]
async fn test_connection_uses_key_header() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.on_get("/v1/models", Reply::json(json!({"data": []})));

    let adapter = harness::adapter("anthropic", &upstream, "/v1");
    assert!(adapter.test_connection().await);
    assert_eq!(upstream.last_request().headers["x-api-key"], "test-key");

    upstream.on_get("/v1/models", Reply::status(StatusCode::UNAUTHORIZED, json!({})));
    assert!(!adapter.test_connection().await);
}

// ABOUTME: Tests for Anthropic client conversions and stream event mapping.
// ABOUTME: Verifies request fields, settings mapping, and SSE payload parsing.

use super::*;

#[test]
fn test_request_serialization() {
    let req = Request::new("claude-sonnet-4-20250514")
        .message(Message::user("Hello"))
        .system("You are helpful")
        .max_tokens(1024);

    let anthropic_req = AnthropicRequest::from(&req);

    assert_eq!(anthropic_req.model, "claude-sonnet-4-20250514");
    assert_eq!(anthropic_req.max_tokens, 1024);
    assert_eq!(anthropic_req.system, Some("You are helpful".to_string()));
    assert_eq!(anthropic_req.messages[0].role, "user");
}

#[test]
fn test_max_tokens_defaults_when_unset() {
    let req = Request::new("m").message(Message::user("Hello"));
    assert_eq!(AnthropicRequest::from(&req).max_tokens, 4096);
}

#[test]
fn test_disabling_parallel_calls_sets_tool_choice() {
    let req = Request::new("m")
        .message(Message::user("Hello"))
        .tool(ToolDefinition::new("t", "d", serde_json::json!({"type": "object"})))
        .settings(ModelSettings::new().parallel_tool_calls(false).top_p(0.5));

    let json = serde_json::to_value(AnthropicRequest::from(&req)).unwrap();
    assert_eq!(json["tool_choice"]["disable_parallel_tool_use"], true);
    assert_eq!(json["top_p"], 0.5);
    assert_eq!(json["tools"][0]["name"], "t");
}

#[test]
fn test_tool_use_response() {
    let json = r#"{
        "id": "msg_456",
        "content": [
            {"type": "text", "text": "Routing to projects."},
            {"type": "tool_use", "id": "tu_1", "name": "assign_task_to_projects_agent", "input": {"task": "create Alpha"}}
        ],
        "stop_reason": "tool_use",
        "model": "claude-sonnet-4-20250514",
        "usage": {"input_tokens": 20, "output_tokens": 15}
    }"#;

    let response = Response::from(serde_json::from_str::<AnthropicResponse>(json).unwrap());

    assert_eq!(response.stop_reason, StopReason::ToolUse);
    assert_eq!(response.tool_uses().len(), 1);
    assert_eq!(response.usage.output_tokens, 15);
}

#[test]
fn test_tool_result_message() {
    let msg = Message::tool_results(vec![ContentBlock::tool_error("tu_1", "timed out")]);

    let json = serde_json::to_value(AnthropicMessage::from(&msg)).unwrap();

    assert_eq!(json["role"], "user");
    assert_eq!(json["content"][0]["type"], "tool_result");
    assert_eq!(json["content"][0]["tool_use_id"], "tu_1");
    assert_eq!(json["content"][0]["is_error"], true);
}

#[test]
fn test_stream_events_map_to_neutral_events() {
    let lines = [
        r#"{"type":"message_start","message":{"id":"msg_1","model":"claude","usage":{"input_tokens":9}}}"#,
        r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"tu_1","name":"lookup","input":{}}}"#,
        r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"q\":"}}"#,
        r#"{"type":"ping"}"#,
        r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":4}}"#,
    ];

    let events: Vec<_> = lines
        .iter()
        .map(|l| serde_json::from_str::<AnthropicStreamEvent>(l).unwrap())
        .filter_map(|e| e.into_stream_event().unwrap())
        .collect();

    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        StreamEvent::MessageStart {
            id: "msg_1".into(),
            model: "claude".into()
        }
    );
    assert_eq!(
        events[2],
        StreamEvent::InputJsonDelta {
            index: 0,
            partial_json: "{\"q\":".into()
        }
    );
    assert!(matches!(
        events[3],
        StreamEvent::MessageDelta {
            stop_reason: Some(StopReason::ToolUse),
            ..
        }
    ));
}

#[test]
fn test_stream_error_event_is_an_error() {
    let wire: AnthropicStreamEvent = serde_json::from_str(
        r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
    )
    .unwrap();
    let err = wire.into_stream_event().unwrap_err();
    assert!(err.to_string().contains("Overloaded"));
}

// ABOUTME: End-to-end routing tests: supervisor, delegation handlers, domain agents
// ABOUTME: and tag-filtered Plane tools working together with a scripted model.

mod common;

use std::sync::{Arc, Mutex};

use futures::StreamExt;

use plane_agent::agent::{AgentEvent, Conversation, RunContext};
use plane_agent::ui::{EventEncoding, UiAdapter};

use common::{plane_provider, routing_client, supervisor};

#[tokio::test]
async fn test_request_is_routed_to_projects_and_work_items() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Arc::new(routing_client());
    let offered = Arc::clone(&client.offered);
    let supervisor = supervisor(client, &[plane_provider(&log)]).await;

    let ctx = RunContext::new();
    let result = supervisor
        .run("Create a project called Alpha and list its work items", &ctx)
        .await
        .unwrap();

    assert_eq!(
        result.output,
        "Summary: create_project done | list_work_items done"
    );

    let mut executed = log.lock().unwrap().clone();
    executed.sort();
    assert_eq!(executed, vec!["create_project", "list_work_items"]);

    // Domain agents only ever saw their own tools.
    let offered = offered.lock().unwrap();
    for names in offered.iter() {
        let supervisor_turn = names.iter().any(|n| n.starts_with("assign_task_to_"));
        if supervisor_turn {
            assert_eq!(names.len(), 18);
        } else {
            assert_eq!(names.len(), 1, "domain agent offered {:?}", names);
        }
    }

    // 2 supervisor turns + 2 turns for each domain agent
    let usage = ctx.usage().snapshot();
    assert_eq!(usage.requests, 6);
    assert_eq!(usage.input_tokens, 60);
}

#[tokio::test]
async fn test_stream_reports_delegations_then_answer() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let supervisor = supervisor(Arc::new(routing_client()), &[plane_provider(&log)]).await;

    let events: Vec<AgentEvent> = supervisor
        .run_stream(
            Conversation::user("Create a project called Alpha and list its work items"),
            RunContext::new(),
        )
        .map(|e| e.unwrap())
        .collect()
        .await;

    let started: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCallStart { tool_name, .. } => Some(tool_name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        started,
        vec![
            "assign_task_to_projects_agent",
            "assign_task_to_work_items_agent"
        ]
    );

    let results: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCallResult { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(results, vec!["create_project done", "list_work_items done"]);

    match events.last() {
        Some(AgentEvent::Finished(result)) => {
            assert!(result.output.starts_with("Summary:"));
        }
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ag_ui_frames_for_routed_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let supervisor = supervisor(Arc::new(routing_client()), &[plane_provider(&log)]).await;
    let adapter = UiAdapter::new(Arc::new(supervisor));

    let body = serde_json::json!({
        "threadId": "thread-alpha",
        "runId": "run-1",
        "messages": [
            {"id": "u1", "role": "user", "content": "Create a project called Alpha and list its work items"}
        ],
        "state": {"workspace": "acme"},
        "forwardedProps": {}
    });
    let stream = adapter
        .adapt(&serde_json::to_vec(&body).unwrap(), Some("application/x-ndjson"))
        .unwrap();
    assert_eq!(stream.encoding, EventEncoding::NdJson);

    let frames: Vec<serde_json::Value> = stream
        .frames
        .map(|f| serde_json::from_str(f.trim_end()).unwrap())
        .collect()
        .await;

    assert_eq!(frames.first().unwrap()["type"], "RUN_STARTED");
    let last = frames.last().unwrap();
    assert_eq!(last["type"], "RUN_FINISHED");
    assert_eq!(last["threadId"], "thread-alpha");

    let results: Vec<&serde_json::Value> = frames
        .iter()
        .filter(|f| f["type"] == "TOOL_CALL_RESULT")
        .collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["toolCallId"], "call_projects");
    assert_eq!(results[0]["messageId"], "result_call_projects");

    let text: String = frames
        .iter()
        .filter(|f| f["type"] == "TEXT_MESSAGE_CONTENT")
        .filter_map(|f| f["delta"].as_str())
        .collect();
    assert_eq!(text, "Summary: create_project done | list_work_items done");
}

#[tokio::test]
async fn test_domain_without_tools_still_answers() {
    let supervisor = supervisor(
        Arc::new(common::ScriptedClient::new(|req| {
            let is_supervisor = req
                .tools
                .iter()
                .any(|t| t.name.starts_with("assign_task_to_"));
            let results = common::last_tool_results(req);
            if is_supervisor && results.is_empty() {
                return Ok(common::tool_calls(&[(
                    "c1",
                    "assign_task_to_cycles_agent",
                    serde_json::json!({"task": "List cycles"}),
                )]));
            }
            if is_supervisor {
                return Ok(common::text(&results.join("")));
            }
            assert!(req.tools.is_empty());
            Ok(common::text("No cycle tools are available."))
        })),
        &[],
    )
    .await;

    let result = supervisor
        .run("What cycles are active?", &RunContext::new())
        .await
        .unwrap();
    assert_eq!(result.output, "No cycle tools are available.");
}

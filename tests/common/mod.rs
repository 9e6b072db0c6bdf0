// ABOUTME: Shared fixtures for integration tests - a scripted model client that
// ABOUTME: plays supervisor and domain agents, and recording Plane-like tools.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use plane_agent::agent::{AgentOptions, DOMAINS, RunContext, Supervisor, SupervisorParams};
use plane_agent::error::LlmError;
use plane_agent::llm::{ContentBlock, LlmClient, Request, Response, Role, StopReason, Usage};
use plane_agent::skills::SkillRoots;
use plane_agent::tool::{Tool, ToolResult};
use plane_agent::toolset::{CapabilityProvider, StaticToolset};

type Script = dyn Fn(&Request) -> Result<Response, LlmError> + Send + Sync;

/// Model client answering through a closure; records the tool names of every request.
pub struct ScriptedClient {
    script: Box<Script>,
    pub offered: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedClient {
    pub fn new(
        script: impl Fn(&Request) -> Result<Response, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            offered: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let names = req.tools.iter().map(|t| t.name.clone()).collect();
        self.offered.lock().unwrap().push(names);
        (self.script)(req)
    }
}

fn usage() -> Usage {
    Usage {
        input_tokens: 10,
        output_tokens: 5,
    }
}

pub fn text(text: &str) -> Response {
    Response {
        id: "scripted".into(),
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        model: "scripted".into(),
        usage: usage(),
    }
}

pub fn tool_calls(calls: &[(&str, &str, serde_json::Value)]) -> Response {
    Response {
        id: "scripted".into(),
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
        model: "scripted".into(),
        usage: usage(),
    }
}

/// Tool results in the request's final turn.
pub fn last_tool_results(req: &Request) -> Vec<String> {
    match req.messages.last() {
        Some(msg) if msg.role == Role::User => msg
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Plays both roles: the supervisor fans "create a project and list its work
/// items" out to two domain agents; each domain agent calls its first Plane
/// tool once and reports the result.
pub fn routing_client() -> ScriptedClient {
    ScriptedClient::new(|req| {
        let results = last_tool_results(req);
        let is_supervisor = req
            .tools
            .iter()
            .any(|t| t.name.starts_with("assign_task_to_"));

        if is_supervisor {
            if results.is_empty() {
                return Ok(tool_calls(&[
                    (
                        "call_projects",
                        "assign_task_to_projects_agent",
                        json!({"task": "Create a project called Alpha"}),
                    ),
                    (
                        "call_work_items",
                        "assign_task_to_work_items_agent",
                        json!({"task": "List the work items of project Alpha"}),
                    ),
                ]));
            }
            return Ok(text(&format!("Summary: {}", results.join(" | "))));
        }

        if !results.is_empty() {
            return Ok(text(&results.join("\n")));
        }
        match req.tools.first() {
            Some(tool) => Ok(tool_calls(&[("call_plane", tool.name.as_str(), json!({}))])),
            None => Ok(text("I have no tools for that.")),
        }
    })
}

/// Tool that logs its own name when executed.
pub struct RecordingTool {
    name: String,
    tags: BTreeSet<String>,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Plane operation"
    }

    fn schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    fn tags(&self) -> BTreeSet<String> {
        self.tags.clone()
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        _params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error> {
        self.log.lock().unwrap().push(self.name.clone());
        Ok(ToolResult::text(format!("{} done", self.name)))
    }
}

/// A tag-filterable provider with one tool for each of a few domains.
pub fn plane_provider(log: &Arc<Mutex<Vec<String>>>) -> CapabilityProvider {
    let tool = |name: &str, tag: &str| -> Arc<dyn Tool> {
        Arc::new(RecordingTool {
            name: name.to_string(),
            tags: BTreeSet::from([tag.to_string()]),
            log: Arc::clone(log),
        })
    };
    CapabilityProvider::Filterable(Arc::new(StaticToolset::new(
        "plane",
        vec![
            tool("create_project", "projects"),
            tool("list_work_items", "work_items"),
            tool("get_me", "users"),
            tool("list_labels", "labels"),
        ],
    )))
}

pub async fn supervisor(
    client: Arc<dyn LlmClient>,
    providers: &[CapabilityProvider],
) -> Supervisor {
    Supervisor::build(SupervisorParams {
        domains: DOMAINS,
        providers,
        client,
        options: AgentOptions::new("scripted-model"),
        skill_roots: SkillRoots::new("/nonexistent/skills"),
        instructions: None,
    })
    .await
    .unwrap()
}

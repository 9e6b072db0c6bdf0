// ABOUTME: A2A (agent-to-agent) JSON-RPC service - agent card, message/send with
// ABOUTME: per-contextId conversation memory, tasks/get and tasks/cancel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::{
    AGENT_DESCRIPTION, AGENT_NAME, Conversation, RunContext, RunResult, Supervisor,
};
use crate::error::RunError;
use crate::llm::Message;
use crate::skills::SkillDescriptor;

pub const A2A_PROTOCOL_VERSION: &str = "0.3.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const TASK_NOT_FOUND: i64 = -32001;
pub const TASK_NOT_CANCELABLE: i64 = -32002;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub protocol_version: String,
    pub preferred_transport: String,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<SkillDescriptor>,
}

/// Advertised when no skill files exist.
pub fn fallback_skill() -> SkillDescriptor {
    SkillDescriptor {
        id: "plane_agent".to_string(),
        name: "Plane Agent".to_string(),
        description: "General access to Plane tools".to_string(),
        tags: vec!["plane".to_string()],
        input_modes: vec!["text".to_string()],
        output_modes: vec!["text".to_string()],
        dir: PathBuf::new(),
    }
}

impl AgentCard {
    pub fn new(url: impl Into<String>, skills: &[SkillDescriptor]) -> Self {
        let skills = if skills.is_empty() {
            vec![fallback_skill()]
        } else {
            skills.to_vec()
        };
        Self {
            name: AGENT_NAME.to_string(),
            description: AGENT_DESCRIPTION.to_string(),
            url: url.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: A2A_PROTOCOL_VERSION.to_string(),
            preferred_transport: "JSONRPC".to_string(),
            capabilities: AgentCapabilities {
                streaming: false,
                push_notifications: false,
                state_transition_history: false,
            },
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    File {
        file: serde_json::Value,
    },
    Data {
        data: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aMessage {
    pub role: String,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default = "message_kind")]
    pub kind: String,
}

fn message_kind() -> String {
    "message".to_string()
}

impl A2aMessage {
    fn agent(text: impl Into<String>, context_id: &str, task_id: &str) -> Self {
        Self {
            role: "agent".to_string(),
            parts: vec![Part::Text { text: text.into() }],
            message_id: Uuid::new_v4().to_string(),
            context_id: Some(context_id.to_string()),
            task_id: Some(task_id.to_string()),
            kind: message_kind(),
        }
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<A2aMessage>,
    pub timestamp: String,
}

impl TaskStatus {
    fn new(state: TaskState, message: Option<A2aMessage>) -> Self {
        Self {
            state,
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    pub name: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    pub artifacts: Vec<Artifact>,
    pub history: Vec<A2aMessage>,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    id: serde_json::Value,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn reply(id: serde_json::Value, outcome: Result<serde_json::Value, JsonRpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendParams {
    message: A2aMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskQueryParams {
    id: String,
    #[serde(default)]
    history_length: Option<usize>,
}

/// Task records, conversation memory per context and cancellation handles
/// for in-flight tasks.
#[derive(Default)]
struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
    contexts: RwLock<HashMap<String, Vec<Message>>>,
    running: RwLock<HashMap<String, CancellationToken>>,
}

impl TaskStore {
    /// Record the outcome of a run. A task canceled meanwhile keeps its
    /// canceled state and its turns stay out of the context memory.
    async fn finish(
        &self,
        task_id: &str,
        context_id: &str,
        outcome: Result<RunResult, RunError>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        self.running.write().await.remove(task_id);

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| JsonRpcError::new(TASK_NOT_FOUND, "task vanished"))?;
        if task.status.state == TaskState::Canceled {
            info!(task = %task_id, "Discarding outcome of canceled task");
            return to_value(&*task);
        }

        match outcome {
            Ok(result) => {
                self.contexts
                    .write()
                    .await
                    .insert(context_id.to_string(), result.messages);
                let reply = A2aMessage::agent(result.output.clone(), context_id, task_id);
                task.artifacts.push(Artifact {
                    artifact_id: Uuid::new_v4().to_string(),
                    name: "result".to_string(),
                    parts: vec![Part::Text {
                        text: result.output,
                    }],
                });
                task.history.push(reply);
                task.status = TaskStatus::new(TaskState::Completed, None);
            }
            Err(e) => {
                warn!(task = %task_id, error = %e, "A2A task failed");
                task.status = TaskStatus::new(
                    TaskState::Failed,
                    Some(A2aMessage::agent(e.to_string(), context_id, task_id)),
                );
            }
        }
        to_value(&*task)
    }
}

/// A2A endpoint state.
pub struct A2aService {
    supervisor: Arc<Supervisor>,
    card: AgentCard,
    store: Arc<TaskStore>,
}

impl A2aService {
    pub fn new(supervisor: Arc<Supervisor>, card: AgentCard) -> Self {
        Self {
            supervisor,
            card,
            store: Arc::new(TaskStore::default()),
        }
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    /// Dispatch one raw JSON-RPC body.
    pub async fn handle(&self, body: &[u8]) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_slice::<serde_json::Value>(body) {
            Err(e) => {
                return JsonRpcResponse::reply(
                    serde_json::Value::Null,
                    Err(JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e))),
                );
            }
            Ok(value) => match serde_json::from_value(value) {
                Ok(request) => request,
                Err(e) => {
                    return JsonRpcResponse::reply(
                        serde_json::Value::Null,
                        Err(JsonRpcError::new(
                            INVALID_REQUEST,
                            format!("Invalid request: {}", e),
                        )),
                    );
                }
            },
        };
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::reply(
                request.id,
                Err(JsonRpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\"")),
            );
        }

        let outcome = match request.method.as_str() {
            "message/send" => self.message_send(request.params).await,
            "tasks/get" => self.tasks_get(request.params).await,
            "tasks/cancel" => self.tasks_cancel(request.params).await,
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };
        JsonRpcResponse::reply(request.id, outcome)
    }

    async fn message_send(
        &self,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let SendParams { mut message } = parse_params(params)?;
        let text = message.text();
        if text.trim().is_empty() {
            return Err(JsonRpcError::new(
                INVALID_PARAMS,
                "message has no text parts",
            ));
        }

        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let task_id = Uuid::new_v4().to_string();
        message.context_id = Some(context_id.clone());
        message.task_id = Some(task_id.clone());

        let ctx = RunContext::new();
        let store = Arc::clone(&self.store);
        store
            .running
            .write()
            .await
            .insert(task_id.clone(), ctx.cancellation_token().clone());
        store.tasks.write().await.insert(
            task_id.clone(),
            Task {
                id: task_id.clone(),
                context_id: context_id.clone(),
                status: TaskStatus::new(TaskState::Working, None),
                artifacts: Vec::new(),
                history: vec![message.clone()],
                kind: "task".to_string(),
            },
        );

        let mut history = store
            .contexts
            .read()
            .await
            .get(&context_id)
            .cloned()
            .unwrap_or_default();
        history.push(Message::user(text));
        info!(task = %task_id, context = %context_id, turns = history.len(), "A2A message received");

        // Runs detached so a dropped request still settles the task.
        let supervisor = Arc::clone(&self.supervisor);
        let run = tokio::spawn(async move {
            let outcome = supervisor
                .run_conversation(Conversation::new(history), &ctx)
                .await;
            store.finish(&task_id, &context_id, outcome).await
        });
        run.await
            .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("task aborted: {}", e)))?
    }

    async fn tasks_get(&self, params: serde_json::Value) -> Result<serde_json::Value, JsonRpcError> {
        let query: TaskQueryParams = parse_params(params)?;
        let tasks = self.store.tasks.read().await;
        let task = tasks
            .get(&query.id)
            .ok_or_else(|| JsonRpcError::new(TASK_NOT_FOUND, "Task not found"))?;

        let mut task = task.clone();
        if let Some(limit) = query.history_length {
            let skip = task.history.len().saturating_sub(limit);
            task.history.drain(..skip);
        }
        to_value(&task)
    }

    async fn tasks_cancel(
        &self,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let query: TaskQueryParams = parse_params(params)?;
        let mut tasks = self.store.tasks.write().await;
        let task = tasks
            .get_mut(&query.id)
            .ok_or_else(|| JsonRpcError::new(TASK_NOT_FOUND, "Task not found"))?;

        if task.status.state.is_terminal() {
            return Err(JsonRpcError::new(
                TASK_NOT_CANCELABLE,
                "Task cannot be canceled",
            ));
        }
        if let Some(token) = self.store.running.read().await.get(&query.id) {
            token.cancel();
        }
        task.status = TaskStatus::new(TaskState::Canceled, None);
        info!(task = %query.id, "A2A task canceled");
        to_value(&*task)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Value,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_value(task: &Task) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(task).map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
}

async fn agent_card(State(service): State<Arc<A2aService>>) -> Json<AgentCard> {
    Json(service.card().clone())
}

async fn rpc(State(service): State<Arc<A2aService>>, body: Bytes) -> Json<JsonRpcResponse> {
    Json(service.handle(&body).await)
}

/// A2A routes under `/a2a`, with and without the trailing slash.
pub fn router(service: Arc<A2aService>) -> Router {
    Router::new()
        .route("/a2a", post(rpc))
        .route("/a2a/", post(rpc))
        .route("/a2a/.well-known/agent.json", get(agent_card))
        .route("/a2a/.well-known/agent-card.json", get(agent_card))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::agent::{AgentOptions, DOMAINS, SupervisorParams};
    use crate::llm::mock::{MockClient, text_response};
    use crate::skills::SkillRoots;

    async fn service(client: MockClient) -> A2aService {
        let supervisor = Supervisor::build(SupervisorParams {
            domains: DOMAINS,
            providers: &[],
            client: Arc::new(client),
            options: AgentOptions::new("m"),
            skill_roots: SkillRoots::new("/nonexistent"),
            instructions: None,
        })
        .await
        .unwrap();
        let card = AgentCard::new("http://localhost:9000/a2a/", supervisor.skills());
        A2aService::new(Arc::new(supervisor), card)
    }

    fn send(text: &str, context_id: Option<&str>) -> Vec<u8> {
        let mut message = serde_json::json!({
            "role": "user",
            "parts": [{"kind": "text", "text": text}],
            "messageId": "m1",
            "kind": "message"
        });
        if let Some(ctx) = context_id {
            message["contextId"] = serde_json::json!(ctx);
        }
        serde_json::to_vec(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "message/send",
            "params": {"message": message}
        }))
        .unwrap()
    }

    fn rpc_body(method: &str, params: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": method,
            "params": params
        }))
        .unwrap()
    }

    async fn running_task_id(service: &A2aService) -> String {
        loop {
            if let Some(id) = service.store.running.read().await.keys().next() {
                return id.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_card_uses_fallback_skill() {
        let card = AgentCard::new("http://x/a2a/", &[]);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["name"], "Plane Agent");
        assert_eq!(json["skills"][0]["id"], "plane_agent");
        assert_eq!(json["skills"][0]["tags"][0], "plane");
        assert_eq!(json["defaultInputModes"][0], "text");
        assert!(json["skills"][0].get("dir").is_none());
    }

    #[tokio::test]
    async fn test_send_completes_and_remembers_context() {
        let service = service(MockClient::new(|req| {
            Ok(text_response(&format!("turns={}", req.messages.len())))
        }))
        .await;

        let first = service.handle(&send("hello", Some("ctx-1"))).await;
        let task = first.result.unwrap();
        assert_eq!(task["status"]["state"], "completed");
        assert_eq!(task["contextId"], "ctx-1");
        assert_eq!(task["artifacts"][0]["parts"][0]["text"], "turns=1");

        // user, assistant, user
        let second = service.handle(&send("again", Some("ctx-1"))).await;
        assert_eq!(
            second.result.unwrap()["artifacts"][0]["parts"][0]["text"],
            "turns=3"
        );

        let fresh = service.handle(&send("new", None)).await;
        assert_eq!(
            fresh.result.unwrap()["artifacts"][0]["parts"][0]["text"],
            "turns=1"
        );
    }

    #[tokio::test]
    async fn test_failed_run_is_failed_task_and_not_cancelable() {
        let service = service(MockClient::new(|_| {
            Err(crate::error::LlmError::Api {
                status: 500,
                message: "down".into(),
            })
        }))
        .await;

        let task = service.handle(&send("hi", None)).await.result.unwrap();
        assert_eq!(task["status"]["state"], "failed");
        assert!(task["status"]["message"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("down"));

        let id = task["id"].as_str().unwrap();
        let body = serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tasks/cancel", "params": {"id": id}});
        let cancel = service.handle(&serde_json::to_vec(&body).unwrap()).await;
        assert_eq!(cancel.error.unwrap().code, TASK_NOT_CANCELABLE);

        let body = serde_json::json!({"jsonrpc": "2.0", "id": 3, "method": "tasks/get", "params": {"id": id, "historyLength": 0}});
        let fetched = service.handle(&serde_json::to_vec(&body).unwrap()).await;
        let fetched = fetched.result.unwrap();
        assert_eq!(fetched["id"], id);
        assert_eq!(fetched["history"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let service = service(MockClient::always("ok")).await;

        assert_eq!(service.handle(b"{oops").await.error.unwrap().code, PARSE_ERROR);

        let unknown = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/resubscribe"});
        let response = service.handle(&serde_json::to_vec(&unknown).unwrap()).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
        assert_eq!(response.id, serde_json::json!(1));

        let missing = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/get", "params": {"id": "nope"}});
        let response = service.handle(&serde_json::to_vec(&missing).unwrap()).await;
        assert_eq!(response.error.unwrap().code, TASK_NOT_FOUND);

        let bad = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "message/send", "params": {}});
        let response = service.handle(&serde_json::to_vec(&bad).unwrap()).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_cancel_during_run_keeps_task_canceled() {
        let client = MockClient::always("done").delayed(Duration::from_millis(300));
        let service = Arc::new(service(client).await);
        let sending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.handle(&send("slow", Some("ctx-c"))).await })
        };

        let id = running_task_id(&service).await;
        let cancel = service
            .handle(&rpc_body("tasks/cancel", serde_json::json!({"id": id})))
            .await;
        assert_eq!(cancel.result.unwrap()["status"]["state"], "canceled");

        let task = sending.await.unwrap().result.unwrap();
        assert_eq!(task["status"]["state"], "canceled");
        assert!(task["artifacts"].as_array().unwrap().is_empty());
        assert!(!service.store.contexts.read().await.contains_key("ctx-c"));
        assert!(service.store.running.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_outcome_arriving_after_cancel_is_discarded() {
        let store = TaskStore::default();
        store.tasks.write().await.insert(
            "t1".to_string(),
            Task {
                id: "t1".to_string(),
                context_id: "ctx".to_string(),
                status: TaskStatus::new(TaskState::Canceled, None),
                artifacts: Vec::new(),
                history: Vec::new(),
                kind: "task".to_string(),
            },
        );
        let late = RunResult {
            output: "late answer".to_string(),
            messages: vec![Message::user("hi")],
            usage: Default::default(),
        };

        let task = store.finish("t1", "ctx", Ok(late)).await.unwrap();
        assert_eq!(task["status"]["state"], "canceled");
        assert!(task["artifacts"].as_array().unwrap().is_empty());
        assert!(store.contexts.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_request_still_settles_task() {
        let client = MockClient::always("done").delayed(Duration::from_millis(100));
        let service = Arc::new(service(client).await);
        let sending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.handle(&send("hi", Some("ctx-d"))).await })
        };

        let id = running_task_id(&service).await;
        sending.abort();

        let query = rpc_body("tasks/get", serde_json::json!({"id": id}));
        let mut state = String::new();
        for _ in 0..100 {
            let task = service.handle(&query).await.result.unwrap();
            state = task["status"]["state"].as_str().unwrap().to_string();
            if state != "working" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state, "completed");
        assert!(service.store.running.read().await.is_empty());
        assert!(service.store.contexts.read().await.contains_key("ctx-d"));
    }
}

// ABOUTME: Agent runner - the think-act loop shared by the supervisor and every
// ABOUTME: domain agent, with blocking and event-streaming entry points.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::context::{RunContext, RunUsage};
use crate::error::{LlmError, RunError};
use crate::llm::{
    ContentBlock, EventStream, LlmClient, Message, ModelSettings, Request, Role, StreamAccumulator,
    StreamEvent,
};
use crate::tool::ToolResult;
use crate::toolset::CapabilitySet;

pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Model and loop settings shared by agents built from one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    pub model: String,
    pub settings: ModelSettings,
    /// Model requests allowed per run.
    pub max_iterations: usize,
    pub tool_timeout: Option<Duration>,
    pub run_timeout: Option<Duration>,
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            settings: ModelSettings::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_timeout: None,
            run_timeout: None,
        }
    }

    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

/// Input history for a run. System entries extend the agent's instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    pub system: Vec<String>,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system: Vec::new(),
            messages,
        }
    }

    /// A conversation holding one user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    pub fn with_system(mut self, text: impl Into<String>) -> Self {
        self.system.push(text.into());
        self
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Final text of the agent.
    pub output: String,
    /// Full history including the final assistant turn.
    pub messages: Vec<Message>,
    /// Usage of the whole request, delegated runs included.
    pub usage: RunUsage,
}

/// Events produced while an agent runs, in production order.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    TextStart {
        message_id: String,
    },
    TextDelta {
        message_id: String,
        delta: String,
    },
    TextEnd {
        message_id: String,
    },
    ToolCallStart {
        tool_call_id: String,
        tool_name: String,
        parent_message_id: Option<String>,
    },
    ToolCallArgs {
        tool_call_id: String,
        delta: String,
    },
    ToolCallEnd {
        tool_call_id: String,
    },
    ToolCallResult {
        tool_call_id: String,
        content: String,
        is_error: bool,
    },
    /// Always the last event of a successful run.
    Finished(RunResult),
}

pub type AgentEventStream<'a> =
    Pin<Box<dyn Stream<Item = Result<AgentEvent, RunError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy)]
enum CallMode {
    Blocking,
    Streaming,
}

struct ToolCall {
    id: String,
    name: String,
    input: serde_json::Value,
}

/// An agent: instructions and tools bound to a model client.
pub struct Agent {
    name: String,
    instructions: String,
    client: Arc<dyn LlmClient>,
    tools: CapabilitySet,
    options: AgentOptions,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        client: Arc<dyn LlmClient>,
        tools: CapabilitySet,
        options: AgentOptions,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            client,
            tools,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &CapabilitySet {
        &self.tools
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Run on a single task.
    pub async fn run(&self, task: &str, ctx: &RunContext) -> Result<RunResult, RunError> {
        self.run_conversation(Conversation::user(task), ctx).await
    }

    /// Run on an existing history until the model stops calling tools.
    pub async fn run_conversation(
        &self,
        conversation: Conversation,
        ctx: &RunContext,
    ) -> Result<RunResult, RunError> {
        let mut events = self.events(conversation, ctx.clone(), CallMode::Blocking);
        while let Some(event) = events.next().await {
            if let AgentEvent::Finished(result) = event? {
                return Ok(result);
            }
        }
        Err(RunError::Llm(LlmError::StreamClosed))
    }

    /// Run with streaming model calls, relaying events as they arrive.
    ///
    /// Dropping the stream drops the run, including in-flight tool calls.
    pub fn run_stream(&self, conversation: Conversation, ctx: RunContext) -> AgentEventStream<'_> {
        self.events(conversation, ctx, CallMode::Streaming)
    }

    fn system_prompt(&self, extra: &[String]) -> String {
        std::iter::once(self.instructions.as_str())
            .chain(extra.iter().map(String::as_str))
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn events(
        &self,
        conversation: Conversation,
        ctx: RunContext,
        mode: CallMode,
    ) -> AgentEventStream<'_> {
        Box::pin(async_stream::try_stream! {
            if conversation.messages.is_empty() {
                Err::<(), RunError>(RunError::EmptyConversation)?;
            }

            let system = self.system_prompt(&conversation.system);
            let definitions = self.tools.definitions();
            let deadline = self.options.run_timeout.map(|t| (Instant::now() + t, t));
            let mut messages = conversation.messages;
            let mut iteration = 0;

            loop {
                if ctx.is_cancelled() {
                    Err::<(), RunError>(RunError::Cancelled)?;
                }
                iteration += 1;
                if iteration > self.options.max_iterations {
                    Err::<(), RunError>(RunError::IterationLimit {
                        agent: self.name.clone(),
                        limit: self.options.max_iterations,
                    })?;
                }
                debug!(agent = %self.name, iteration, messages = messages.len(), "Requesting model turn");

                let request = Request::new(&self.options.model)
                    .system(system.clone())
                    .messages(messages.clone())
                    .tools(definitions.clone())
                    .settings(self.options.settings.clone());

                let mut acc = StreamAccumulator::new();
                let mut turn = TurnTranslator::default();
                {
                    let mut model_events: EventStream<'_> = match mode {
                        CallMode::Streaming => self.client.create_message_stream(&request),
                        CallMode::Blocking => {
                            let response = within(&ctx, deadline, self.client.create_message(&request)).await??;
                            Box::pin(futures::stream::iter(
                                StreamEvent::replay(&response).into_iter().map(Ok),
                            ))
                        }
                    };
                    while let Some(event) = within(&ctx, deadline, model_events.next()).await? {
                        let event = event?;
                        acc.handle_event(&event);
                        for out in turn.translate(&event) {
                            yield out;
                        }
                    }
                }
                for out in turn.finish() {
                    yield out;
                }

                ctx.usage().record_request(acc.usage());
                let content = acc.into_content();
                let calls: Vec<ToolCall> = content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        }),
                        _ => None,
                    })
                    .collect();

                let assistant = Message {
                    role: Role::Assistant,
                    content,
                };
                if calls.is_empty() {
                    let output = assistant.text();
                    if !assistant.content.is_empty() {
                        messages.push(assistant);
                    }
                    debug!(agent = %self.name, iteration, "Run complete");
                    yield AgentEvent::Finished(RunResult {
                        output,
                        messages,
                        usage: ctx.usage().snapshot(),
                    });
                    break;
                }
                messages.push(assistant);

                ctx.usage().record_tool_calls(calls.len());
                if ctx.is_cancelled() {
                    Err::<(), RunError>(RunError::Cancelled)?;
                }
                let results = within(&ctx, deadline, self.execute_tools(&ctx, &calls)).await?;

                let mut blocks = Vec::with_capacity(results.len());
                for (call, result) in calls.iter().zip(results) {
                    yield AgentEvent::ToolCallResult {
                        tool_call_id: call.id.clone(),
                        content: result.content.clone(),
                        is_error: result.is_error,
                    };
                    blocks.push(result.into_block(&call.id));
                }
                messages.push(Message::tool_results(blocks));
            }
        })
    }

    async fn execute_tools(&self, ctx: &RunContext, calls: &[ToolCall]) -> Vec<ToolResult> {
        if calls.len() > 1 && self.options.settings.allows_parallel_tool_calls() {
            futures::future::join_all(calls.iter().map(|call| self.call_tool(ctx, call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.call_tool(ctx, call).await);
            }
            results
        }
    }

    async fn call_tool(&self, ctx: &RunContext, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolResult::error(format!("Tool '{}' not found", call.name));
        };
        debug!(agent = %self.name, tool = %call.name, "Executing tool");

        let execution = tool.execute(ctx, call.input.clone());
        let outcome = match self.options.tool_timeout {
            Some(limit) => match tokio::time::timeout(limit, execution).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return ToolResult::error(format!(
                        "Tool '{}' timed out after {}s",
                        call.name,
                        limit.as_secs()
                    ));
                }
            },
            None => execution.await,
        };

        outcome.unwrap_or_else(|e| ToolResult::error(format!("Tool '{}' failed: {}", call.name, e)))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools)
            .field("options", &self.options)
            .finish()
    }
}

/// Awaits `fut` until the run deadline passes or the context is cancelled.
async fn within<F: Future>(
    ctx: &RunContext,
    deadline: Option<(Instant, Duration)>,
    fut: F,
) -> Result<F::Output, RunError> {
    let limited = async {
        match deadline {
            Some((at, limit)) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| RunError::Timeout(limit)),
            None => Ok(fut.await),
        }
    };
    tokio::select! {
        biased;
        _ = ctx.cancellation_token().cancelled() => Err(RunError::Cancelled),
        outcome = limited => outcome,
    }
}

/// Maps one model turn's stream events onto agent events.
#[derive(Default)]
struct TurnTranslator {
    text: BTreeMap<usize, String>,
    tools: BTreeMap<usize, String>,
    last_message_id: Option<String>,
}

impl TurnTranslator {
    fn translate(&mut self, event: &StreamEvent) -> Vec<AgentEvent> {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                block: ContentBlock::ToolUse { id, name, .. },
            } => {
                self.tools.insert(*index, id.clone());
                vec![AgentEvent::ToolCallStart {
                    tool_call_id: id.clone(),
                    tool_name: name.clone(),
                    parent_message_id: self.last_message_id.clone(),
                }]
            }
            StreamEvent::ContentBlockStart {
                index,
                block: ContentBlock::Text { text },
            }
            | StreamEvent::ContentBlockDelta { index, text } => self.text_delta(*index, text),
            StreamEvent::InputJsonDelta {
                index,
                partial_json,
            } if !partial_json.is_empty() => match self.tools.get(index) {
                Some(id) => vec![AgentEvent::ToolCallArgs {
                    tool_call_id: id.clone(),
                    delta: partial_json.clone(),
                }],
                None => Vec::new(),
            },
            StreamEvent::ContentBlockStop { index } => self.close(*index).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    // Text messages start lazily so none is ever empty.
    fn text_delta(&mut self, index: usize, text: &str) -> Vec<AgentEvent> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let message_id = match self.text.get(&index) {
            Some(id) => id.clone(),
            None => {
                let id = format!("msg_{}", Uuid::new_v4().simple());
                self.text.insert(index, id.clone());
                self.last_message_id = Some(id.clone());
                out.push(AgentEvent::TextStart {
                    message_id: id.clone(),
                });
                id
            }
        };
        out.push(AgentEvent::TextDelta {
            message_id,
            delta: text.to_string(),
        });
        out
    }

    fn close(&mut self, index: usize) -> Option<AgentEvent> {
        if let Some(message_id) = self.text.remove(&index) {
            return Some(AgentEvent::TextEnd { message_id });
        }
        self.tools
            .remove(&index)
            .map(|tool_call_id| AgentEvent::ToolCallEnd { tool_call_id })
    }

    /// Close whatever the provider left open.
    fn finish(&mut self) -> Vec<AgentEvent> {
        let mut indices: Vec<usize> = self.text.keys().chain(self.tools.keys()).copied().collect();
        indices.sort_unstable();
        indices.into_iter().filter_map(|i| self.close(i)).collect()
    }
}

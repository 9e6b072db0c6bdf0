// ABOUTME: AG-UI wire types - the RunAgentInput request body with its message history,
// ABOUTME: and the outbound UiEvent enum serialized as {"type": "RUN_STARTED", ...}.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentEvent, Conversation};
use crate::llm::{ContentBlock, Message, Role};

/// Body of `POST /ag-ui`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    pub thread_id: String,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    #[serde(default)]
    pub state: serde_json::Value,
    pub messages: Vec<UiMessage>,
    /// Client-side tools. Accepted but not offered to the model.
    #[serde(default)]
    pub tools: Vec<UiTool>,
    #[serde(default)]
    pub context: Vec<UiContext>,
    #[serde(default)]
    pub forwarded_props: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiContext {
    pub description: String,
    pub value: String,
}

/// One history entry, discriminated by `role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum UiMessage {
    User {
        id: String,
        content: UserContent,
    },
    Assistant {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, rename = "toolCalls", skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<UiToolCall>,
    },
    Tool {
        id: String,
        content: String,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    System {
        id: String,
        content: String,
    },
    Developer {
        id: String,
        content: String,
    },
}

impl UiMessage {
    pub fn id(&self) -> &str {
        match self {
            UiMessage::User { id, .. }
            | UiMessage::Assistant { id, .. }
            | UiMessage::Tool { id, .. }
            | UiMessage::System { id, .. }
            | UiMessage::Developer { id, .. } => id,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            UiMessage::User { .. } => "user",
            UiMessage::Assistant { .. } => "assistant",
            UiMessage::Tool { .. } => "tool",
            UiMessage::System { .. } => "system",
            UiMessage::Developer { .. } => "developer",
        }
    }
}

/// User content: plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<InputPart>),
}

impl UserContent {
    pub fn text(&self) -> String {
        match self {
            UserContent::Text(text) => text.clone(),
            UserContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    InputPart::Text { text } => Some(text.as_str()),
                    InputPart::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputPart {
    Text {
        text: String,
    },
    /// Binary and other non-text parts are ignored.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: UiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiFunctionCall {
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

impl RunAgentInput {
    /// Convert the history into a model conversation.
    ///
    /// System and developer messages and context entries become extra
    /// instructions; consecutive tool messages share one tool-result turn.
    pub fn to_conversation(&self) -> Conversation {
        let mut conversation = Conversation::default();

        for ctx in &self.context {
            conversation
                .system
                .push(format!("{}: {}", ctx.description, ctx.value));
        }

        for message in &self.messages {
            match message {
                UiMessage::System { content, .. } | UiMessage::Developer { content, .. } => {
                    conversation.system.push(content.clone());
                }
                UiMessage::User { content, .. } => {
                    conversation.messages.push(Message::user(content.text()));
                }
                UiMessage::Assistant {
                    content,
                    tool_calls,
                    ..
                } => {
                    let mut blocks = Vec::new();
                    if let Some(text) = content.as_deref().filter(|t| !t.is_empty()) {
                        blocks.push(ContentBlock::text(text));
                    }
                    for call in tool_calls {
                        blocks.push(ContentBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.function.name.clone(),
                            input: serde_json::from_str(&call.function.arguments)
                                .unwrap_or_else(|_| serde_json::json!({})),
                        });
                    }
                    if !blocks.is_empty() {
                        conversation.messages.push(Message {
                            role: Role::Assistant,
                            content: blocks,
                        });
                    }
                }
                UiMessage::Tool {
                    content,
                    tool_call_id,
                    error,
                    ..
                } => {
                    let block = ContentBlock::ToolResult {
                        tool_use_id: tool_call_id.clone(),
                        content: error.clone().unwrap_or_else(|| content.clone()),
                        is_error: error.is_some(),
                    };
                    match conversation.messages.last_mut() {
                        Some(last)
                            if last.role == Role::User
                                && last
                                    .content
                                    .iter()
                                    .all(|b| matches!(b, ContentBlock::ToolResult { .. })) =>
                        {
                            last.content.push(block);
                        }
                        _ => conversation.messages.push(Message::tool_results(vec![block])),
                    }
                }
            }
        }

        conversation
    }
}

/// Values from the run input made available to tools through the RunContext.
#[derive(Debug, Clone, PartialEq)]
pub struct UiRunDeps {
    pub thread_id: String,
    pub run_id: String,
    pub state: serde_json::Value,
    pub forwarded_props: serde_json::Value,
}

/// Outbound AG-UI events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiEvent {
    #[serde(rename_all = "camelCase")]
    RunStarted {
        thread_id: String,
        run_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_run_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageStart { message_id: String, role: String },
    #[serde(rename_all = "camelCase")]
    TextMessageContent { message_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    TextMessageEnd { message_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolCallArgs { tool_call_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    ToolCallEnd { tool_call_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCallResult {
        message_id: String,
        tool_call_id: String,
        content: String,
        role: String,
    },
    #[serde(rename_all = "camelCase")]
    RunFinished {
        thread_id: String,
        run_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },
    RunError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl UiEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UiEvent::RunFinished { .. } | UiEvent::RunError { .. })
    }

    /// Translate an agent event. `Finished` maps to `RUN_FINISHED` for
    /// the given thread and run.
    pub fn from_agent(event: AgentEvent, thread_id: &str, run_id: &str) -> Self {
        match event {
            AgentEvent::TextStart { message_id } => UiEvent::TextMessageStart {
                message_id,
                role: "assistant".to_string(),
            },
            AgentEvent::TextDelta { message_id, delta } => {
                UiEvent::TextMessageContent { message_id, delta }
            }
            AgentEvent::TextEnd { message_id } => UiEvent::TextMessageEnd { message_id },
            AgentEvent::ToolCallStart {
                tool_call_id,
                tool_name,
                parent_message_id,
            } => UiEvent::ToolCallStart {
                tool_call_id,
                tool_call_name: tool_name,
                parent_message_id,
            },
            AgentEvent::ToolCallArgs {
                tool_call_id,
                delta,
            } => UiEvent::ToolCallArgs {
                tool_call_id,
                delta,
            },
            AgentEvent::ToolCallEnd { tool_call_id } => UiEvent::ToolCallEnd { tool_call_id },
            AgentEvent::ToolCallResult {
                tool_call_id,
                content,
                ..
            } => UiEvent::ToolCallResult {
                message_id: format!("result_{}", tool_call_id),
                tool_call_id,
                content,
                role: "tool".to_string(),
            },
            AgentEvent::Finished(result) => UiEvent::RunFinished {
                thread_id: thread_id.to_string(),
                run_id: run_id.to_string(),
                result: Some(serde_json::Value::String(result.output)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_roles() {
        let input: RunAgentInput = serde_json::from_value(serde_json::json!({
            "threadId": "t1",
            "runId": "r1",
            "messages": [
                {"id": "s", "role": "developer", "content": "Be brief."},
                {"id": "1", "role": "user", "content": "list projects"},
                {"id": "2", "role": "assistant", "toolCalls": [
                    {"id": "c1", "type": "function", "function": {"name": "assign_task_to_projects_agent", "arguments": "{\"task\":\"list\"}"}},
                    {"id": "c2", "type": "function", "function": {"name": "assign_task_to_cycles_agent", "arguments": "not json"}}
                ]},
                {"id": "3", "role": "tool", "toolCallId": "c1", "content": "Alpha, Beta"},
                {"id": "4", "role": "tool", "toolCallId": "c2", "content": "", "error": "boom"},
                {"id": "5", "role": "user", "content": [{"type": "text", "text": "thanks"}, {"type": "binary", "mimeType": "image/png"}]}
            ]
        }))
        .unwrap();

        let conversation = input.to_conversation();
        assert_eq!(conversation.system, vec!["Be brief."]);
        assert_eq!(conversation.messages.len(), 4);

        let calls = &conversation.messages[1].content;
        assert!(matches!(&calls[0], ContentBlock::ToolUse { input, .. } if input["task"] == "list"));
        assert!(matches!(&calls[1], ContentBlock::ToolUse { input, .. } if *input == serde_json::json!({})));

        let results = &conversation.messages[2].content;
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[1],
            ContentBlock::ToolResult {
                tool_use_id: "c2".into(),
                content: "boom".into(),
                is_error: true,
            }
        );
        assert_eq!(conversation.messages[3].text(), "thanks");
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let result: Result<RunAgentInput, _> =
            serde_json::from_value(serde_json::json!({"threadId": "t", "messages": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = UiEvent::ToolCallStart {
            tool_call_id: "c1".into(),
            tool_call_name: "assign_task_to_projects_agent".into(),
            parent_message_id: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "type": "TOOL_CALL_START",
                "toolCallId": "c1",
                "toolCallName": "assign_task_to_projects_agent"
            })
        );

        let started = UiEvent::RunStarted {
            thread_id: "t".into(),
            run_id: "r".into(),
            parent_run_id: None,
        };
        assert_eq!(
            serde_json::to_value(&started).unwrap()["type"],
            "RUN_STARTED"
        );
        assert!(!started.is_terminal());
    }
}

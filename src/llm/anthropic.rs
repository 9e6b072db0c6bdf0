// ABOUTME: Anthropic Messages API client implementation.
// ABOUTME: Implements LlmClient for Claude models, blocking and streaming.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{EventStream, LlmClient, StreamEvent};
use super::{
    ContentBlock, LineBuffer, Message, Request, Response, StopReason, ToolDefinition, Usage,
};
use crate::error::LlmError;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic API request format.
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<AnthropicTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Anthropic message format.
#[derive(Debug, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<AnthropicContent>,
}

/// Anthropic content block.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

/// Anthropic tool definition.
#[derive(Debug, Serialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Anthropic API response format.
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub id: String,
    pub content: Vec<AnthropicContent>,
    pub stop_reason: Option<String>,
    pub model: String,
    pub usage: AnthropicUsage,
}

/// Anthropic usage stats.
#[derive(Debug, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Anthropic API error response.
#[derive(Debug, Deserialize)]
pub struct AnthropicError {
    pub error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Server-sent event payloads of the streaming Messages API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    MessageStart {
        message: AnthropicStreamMessage,
    },
    ContentBlockStart {
        index: usize,
        content_block: AnthropicContent,
    },
    ContentBlockDelta {
        index: usize,
        delta: AnthropicDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: AnthropicMessageDelta,
        #[serde(default)]
        usage: AnthropicUsage,
    },
    MessageStop,
    Ping,
    Error {
        error: AnthropicErrorDetail,
    },
}

#[derive(Debug, Deserialize)]
pub struct AnthropicStreamMessage {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
pub struct AnthropicMessageDelta {
    pub stop_reason: Option<String>,
}

impl From<&ContentBlock> for AnthropicContent {
    fn from(block: &ContentBlock) -> Self {
        match block.clone() {
            ContentBlock::Text { text } => AnthropicContent::Text { text },
            ContentBlock::ToolUse { id, name, input } => {
                AnthropicContent::ToolUse { id, name, input }
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => AnthropicContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
        }
    }
}

impl From<AnthropicContent> for ContentBlock {
    fn from(content: AnthropicContent) -> Self {
        match content {
            AnthropicContent::Text { text } => ContentBlock::Text { text },
            AnthropicContent::ToolUse { id, name, input } => {
                ContentBlock::ToolUse { id, name, input }
            }
            AnthropicContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
        }
    }
}

impl From<&Message> for AnthropicMessage {
    fn from(msg: &Message) -> Self {
        AnthropicMessage {
            role: match msg.role {
                super::Role::User => "user".to_string(),
                super::Role::Assistant => "assistant".to_string(),
            },
            content: msg.content.iter().map(AnthropicContent::from).collect(),
        }
    }
}

impl From<&ToolDefinition> for AnthropicTool {
    fn from(tool: &ToolDefinition) -> Self {
        AnthropicTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }
}

impl From<&Request> for AnthropicRequest {
    fn from(req: &Request) -> Self {
        let settings = &req.settings;
        // Anthropic expresses parallelism inverted, on tool_choice
        let tool_choice = match settings.parallel_tool_calls {
            Some(false) if !req.tools.is_empty() => Some(serde_json::json!({
                "type": "auto",
                "disable_parallel_tool_use": true
            })),
            _ => None,
        };

        AnthropicRequest {
            model: req.model.clone(),
            messages: req.messages.iter().map(AnthropicMessage::from).collect(),
            max_tokens: settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: req.system.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop_sequences: settings.stop_sequences.clone(),
            tools: req.tools.iter().map(AnthropicTool::from).collect(),
            tool_choice,
            stream: None,
        }
    }
}

fn parse_stop_reason(s: Option<&str>) -> StopReason {
    match s {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

impl From<AnthropicResponse> for Response {
    fn from(resp: AnthropicResponse) -> Self {
        Response {
            id: resp.id,
            content: resp.content.into_iter().map(ContentBlock::from).collect(),
            stop_reason: parse_stop_reason(resp.stop_reason.as_deref()),
            model: resp.model,
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
        }
    }
}

impl AnthropicStreamEvent {
    /// Map a wire event onto the provider-neutral stream event, if it has one.
    pub fn into_stream_event(self) -> Result<Option<StreamEvent>, LlmError> {
        let event = match self {
            AnthropicStreamEvent::MessageStart { message } => {
                return Ok(Some(StreamEvent::MessageStart {
                    id: message.id,
                    model: message.model,
                }));
            }
            AnthropicStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => StreamEvent::ContentBlockStart {
                index,
                block: content_block.into(),
            },
            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                AnthropicDelta::TextDelta { text } => {
                    StreamEvent::ContentBlockDelta { index, text }
                }
                AnthropicDelta::InputJsonDelta { partial_json } => StreamEvent::InputJsonDelta {
                    index,
                    partial_json,
                },
            },
            AnthropicStreamEvent::ContentBlockStop { index } => {
                StreamEvent::ContentBlockStop { index }
            }
            AnthropicStreamEvent::MessageDelta { delta, usage } => StreamEvent::MessageDelta {
                stop_reason: Some(parse_stop_reason(delta.stop_reason.as_deref())),
                usage: Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                },
            },
            AnthropicStreamEvent::MessageStop => StreamEvent::MessageStop,
            AnthropicStreamEvent::Ping => return Ok(None),
            AnthropicStreamEvent::Error { error } => {
                return Err(LlmError::Api {
                    status: 0,
                    message: format!("{}: {}", error.error_type, error.message),
                });
            }
        };
        Ok(Some(event))
    }
}

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LlmError::Configuration("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    fn post(&self, headers: &BTreeMap<String, String>) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn body(req: &Request, stream: bool) -> Result<serde_json::Value, LlmError> {
        let mut anthropic_req = AnthropicRequest::from(req);
        if stream {
            anthropic_req.stream = Some(true);
        }
        let mut body = serde_json::to_value(&anthropic_req)?;
        req.settings.apply_extra_body(&mut body);
        Ok(body)
    }
}

async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AnthropicError>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text);
    LlmError::Api { status, message }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let body = Self::body(req, false)?;
        let response = self
            .post(&req.settings.extra_headers)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let resp: AnthropicResponse = response.json().await?;
        Ok(Response::from(resp))
    }

    fn create_message_stream<'a>(&'a self, req: &'a Request) -> EventStream<'a> {
        Box::pin(async_stream::try_stream! {
            let body = Self::body(req, true)?;
            let response = self
                .post(&req.settings.extra_headers)
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                Err::<(), LlmError>(api_error(response).await)?;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut input_tokens = 0;

            while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
                let chunk = chunk?;
                for line in lines.push(&chunk) {
                    let line = line.trim();
                    // "event:" lines repeat the type carried in the data payload
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let wire: AnthropicStreamEvent = serde_json::from_str(data.trim_start())?;

                    // Input tokens arrive on message_start, output on message_delta
                    if let AnthropicStreamEvent::MessageStart { message } = &wire {
                        input_tokens = message.usage.input_tokens;
                    }
                    match wire.into_stream_event()? {
                        Some(StreamEvent::MessageDelta { stop_reason, usage }) => {
                            yield StreamEvent::MessageDelta {
                                stop_reason,
                                usage: Usage {
                                    input_tokens: input_tokens.max(usage.input_tokens),
                                    output_tokens: usage.output_tokens,
                                },
                            };
                        }
                        Some(event) => yield event,
                        None => {}
                    }
                }
            }
        })
    }
}

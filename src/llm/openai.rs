// ABOUTME: OpenAI-compatible chat-completions client.
// ABOUTME: Serves OpenAI itself plus any provider exposing the same wire format.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{EventStream, LlmClient, StreamEvent};
use super::{
    ContentBlock, LineBuffer, Message, Request, Response, Role, StopReason, ToolDefinition, Usage,
};
use crate::error::LlmError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API request format.
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAITool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<serde_json::Value>,
}

/// OpenAI message format.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// OpenAI tool call in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: OpenAIFunctionCall,
}

/// OpenAI function call details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunctionCall {
    pub name: String,
    pub arguments: String,
}

/// OpenAI tool definition.
#[derive(Debug, Serialize)]
pub struct OpenAITool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAIFunction,
}

/// OpenAI function definition.
#[derive(Debug, Serialize)]
pub struct OpenAIFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
    pub usage: Option<OpenAIUsage>,
}

/// OpenAI response choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
    pub finish_reason: Option<String>,
}

/// OpenAI response message.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
}

/// OpenAI usage stats.
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
}

/// OpenAI streaming chunk.
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<OpenAIStreamChoice>,
    pub usage: Option<OpenAIUsage>,
}

/// OpenAI streaming choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChoice {
    pub delta: OpenAIDelta,
    pub finish_reason: Option<String>,
}

/// OpenAI streaming delta.
#[derive(Debug, Deserialize)]
pub struct OpenAIDelta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAIToolCallDelta>>,
}

/// OpenAI streaming tool call delta.
#[derive(Debug, Deserialize)]
pub struct OpenAIToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub function: Option<OpenAIFunctionDelta>,
}

/// OpenAI streaming function delta.
#[derive(Debug, Deserialize)]
pub struct OpenAIFunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Client for OpenAI-compatible chat-completions endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAIClient {
    /// Create a client for api.openai.com with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()).filter(|k: &String| !k.is_empty()),
            base_url: OPENAI_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from the OPENAI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LlmError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, TLS settings).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn post(&self, headers: &BTreeMap<String, String>) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

impl From<&ToolDefinition> for OpenAITool {
    fn from(tool: &ToolDefinition) -> Self {
        OpenAITool {
            tool_type: "function".to_string(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

impl From<&Message> for OpenAIMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let tool_calls: Vec<OpenAIToolCall> = msg
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(OpenAIToolCall {
                    id: id.clone(),
                    call_type: "function".to_string(),
                    function: OpenAIFunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                }),
                _ => None,
            })
            .collect();

        let text = msg.text();

        OpenAIMessage {
            role: role.to_string(),
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }
}

fn convert_messages(messages: &[Message]) -> Vec<OpenAIMessage> {
    let mut result = Vec::new();

    for msg in messages {
        let tool_results: Vec<_> = msg
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => Some((tool_use_id.clone(), content.clone())),
                _ => None,
            })
            .collect();

        if tool_results.is_empty() {
            result.push(OpenAIMessage::from(msg));
        } else {
            // One "tool" message per result
            for (tool_use_id, content) in tool_results {
                result.push(OpenAIMessage {
                    role: "tool".to_string(),
                    content: Some(content),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id),
                });
            }
        }
    }

    result
}

impl From<&Request> for OpenAIRequest {
    fn from(req: &Request) -> Self {
        let mut messages = Vec::new();

        if let Some(ref system) = req.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.extend(convert_messages(&req.messages));

        let settings = &req.settings;
        OpenAIRequest {
            model: req.model.clone(),
            messages,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            seed: settings.seed,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            logit_bias: settings.logit_bias.clone(),
            stop: settings.stop_sequences.clone(),
            tools: req.tools.iter().map(OpenAITool::from).collect(),
            // Only meaningful when tools are offered
            parallel_tool_calls: if req.tools.is_empty() {
                None
            } else {
                settings.parallel_tool_calls
            },
            stream: None,
            stream_options: None,
        }
    }
}

/// Serialize a request body, optionally in streaming mode, with extra_body applied.
pub fn request_body(req: &Request, stream: bool) -> Result<serde_json::Value, LlmError> {
    let mut openai_req = OpenAIRequest::from(req);
    if stream {
        openai_req.stream = Some(true);
        openai_req.stream_options = Some(serde_json::json!({ "include_usage": true }));
    }
    let mut body = serde_json::to_value(&openai_req)?;
    req.settings.apply_extra_body(&mut body);
    Ok(body)
}

fn parse_stop_reason(s: Option<&str>) -> StopReason {
    match s {
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

impl From<OpenAIResponse> for Response {
    fn from(resp: OpenAIResponse) -> Self {
        let mut content = Vec::new();
        let mut finish_reason = None;

        if let Some(choice) = resp.choices.into_iter().next() {
            finish_reason = choice.finish_reason;
            if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
                content.push(ContentBlock::Text { text });
            }
            for call in choice.message.tool_calls.unwrap_or_default() {
                let input: serde_json::Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or_default();
                content.push(ContentBlock::ToolUse {
                    id: call.id,
                    name: call.function.name,
                    input,
                });
            }
        }

        let usage = resp
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Response {
            id: resp.id,
            content,
            stop_reason: parse_stop_reason(finish_reason.as_deref()),
            model: resp.model,
            usage,
        }
    }
}

fn parse_sse_line(line: &str) -> Option<OpenAIStreamChunk> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }
    serde_json::from_str(data).ok()
}

async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<OpenAIError>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text);
    LlmError::Api { status, message }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let body = request_body(req, false)?;
        let response = self
            .post(&req.settings.extra_headers)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let openai_resp: OpenAIResponse = response.json().await?;
        Ok(Response::from(openai_resp))
    }

    fn create_message_stream<'a>(&'a self, req: &'a Request) -> EventStream<'a> {
        Box::pin(async_stream::try_stream! {
            let body = request_body(req, true)?;
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
            let mut message_started = false;
            let mut text_open = false;
            let mut stop_reason = None;
            let mut usage = Usage::default();
            // (id, name, started) per tool call index
            let mut tool_calls: Vec<(String, String, bool)> = Vec::new();

            while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
                let chunk = chunk?;
                for line in lines.push(&chunk) {
                    let Some(chunk) = parse_sse_line(line.trim()) else {
                        continue;
                    };

                    if !message_started {
                        yield StreamEvent::MessageStart {
                            id: chunk.id.clone(),
                            model: chunk.model.clone(),
                        };
                        message_started = true;
                    }

                    if let Some(u) = chunk.usage {
                        usage = Usage {
                            input_tokens: u.prompt_tokens,
                            output_tokens: u.completion_tokens,
                        };
                    }

                    for choice in chunk.choices {
                        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                            if !text_open {
                                yield StreamEvent::ContentBlockStart {
                                    index: 0,
                                    block: ContentBlock::text(""),
                                };
                                text_open = true;
                            }
                            yield StreamEvent::ContentBlockDelta { index: 0, text };
                        }

                        for tc in choice.delta.tool_calls.unwrap_or_default() {
                            let idx = tc.index;
                            while tool_calls.len() <= idx {
                                tool_calls.push((String::new(), String::new(), false));
                            }
                            if let Some(id) = tc.id {
                                tool_calls[idx].0 = id;
                            }
                            let Some(func) = tc.function else { continue };
                            if let Some(name) = func.name {
                                tool_calls[idx].1 = name;
                            }

                            // Text occupies index 0, tool calls follow
                            let (id, name, started) = &mut tool_calls[idx];
                            if !*started && !id.is_empty() && !name.is_empty() {
                                *started = true;
                                yield StreamEvent::ContentBlockStart {
                                    index: idx + 1,
                                    block: ContentBlock::ToolUse {
                                        id: id.clone(),
                                        name: name.clone(),
                                        input: serde_json::json!({}),
                                    },
                                };
                            }
                            if let Some(args) = func.arguments.filter(|a| !a.is_empty()) {
                                yield StreamEvent::InputJsonDelta {
                                    index: idx + 1,
                                    partial_json: args,
                                };
                            }
                        }

                        if let Some(reason) = choice.finish_reason {
                            if text_open {
                                yield StreamEvent::ContentBlockStop { index: 0 };
                                text_open = false;
                            }
                            for (idx, (_, _, started)) in tool_calls.iter_mut().enumerate() {
                                if *started {
                                    *started = false;
                                    yield StreamEvent::ContentBlockStop { index: idx + 1 };
                                }
                            }
                            stop_reason = Some(parse_stop_reason(Some(&reason)));
                        }
                    }
                }
            }

            if !message_started {
                Err::<(), LlmError>(LlmError::StreamClosed)?;
                return;
            }

            yield StreamEvent::MessageDelta { stop_reason, usage };
            yield StreamEvent::MessageStop;
        })
    }
}

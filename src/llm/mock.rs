// ABOUTME: Scripted LlmClient for unit tests.
// ABOUTME: Answers each request through a closure so tests can route on prompt and history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ContentBlock, LlmClient, Request, Response, Role, StopReason, Usage};
use crate::error::LlmError;

type Script = dyn Fn(&Request) -> Result<Response, LlmError> + Send + Sync;

pub struct MockClient {
    script: Box<Script>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockClient {
    pub fn new(script: impl Fn(&Request) -> Result<Response, LlmError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep this long before answering each request.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// A client that always answers with the same text.
    pub fn always(text: &'static str) -> Self {
        Self::new(move |_| Ok(text_response(text)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(req)
    }
}

pub fn text_response(text: &str) -> Response {
    Response {
        id: "mock".into(),
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        model: "mock".into(),
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

pub fn tool_calls_response(calls: &[(&str, &str, serde_json::Value)]) -> Response {
    Response {
        id: "mock".into(),
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
        model: "mock".into(),
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

/// Tool results carried by the last message, if it is a tool-result turn.
pub fn tool_results(req: &Request) -> Vec<(String, bool)> {
    match req.messages.last() {
        Some(msg) if msg.role == Role::User => msg
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult {
                    content, is_error, ..
                } => Some((content.clone(), *is_error)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

// ABOUTME: Transport abstraction for MCP communication, plus shared HTTP options.
// ABOUTME: Re-exports the stdio, SSE, and streamable HTTP transports.

mod http;
mod sse;
mod stdio;

pub use http::HttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::{McpNotification, McpRequest, McpResponse};
use crate::error::McpError;
use crate::llm::LineBuffer;

/// How long to wait for a JSON-RPC answer when no timeout is configured.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for MCP transport implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and receive a response.
    async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError>;

    /// Send a notification (no response expected).
    async fn notify(&self, notification: McpNotification) -> Result<(), McpError>;

    /// Shutdown the transport.
    async fn shutdown(&self) -> Result<(), McpError>;
}

/// Settings shared by the HTTP-based transports.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub ssl_verify: bool,
    pub timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            ssl_verify: true,
            timeout: None,
        }
    }
}

impl HttpOptions {
    pub fn request_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build a client carrying `headers` on every request.
    ///
    /// No overall request timeout is set: SSE streams stay open for the
    /// lifetime of the connection. Callers bound individual requests.
    pub fn client(&self, headers: &BTreeMap<String, String>) -> Result<reqwest::Client, McpError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| McpError::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::Config(format!("Invalid header value for '{}': {}", name, e)))?;
            default_headers.insert(name, value);
        }

        reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.ssl_verify)
            .connect_timeout(Duration::from_secs(30))
            .default_headers(default_headers)
            .user_agent(format!("plane-agent/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Connection(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Incremental parser for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    lines: LineBuffer,
    event: String,
    data: Vec<String>,
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseParser {
    /// Feed a chunk and collect every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();

        for line in self.lines.push(chunk) {
            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
            } else if let Some(value) = field(&line, "event") {
                self.event = value.to_string();
            } else if let Some(value) = field(&line, "data") {
                self.data.push(value.to_string());
            }
        }
        events
    }

    /// Flush a trailing event not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = self.lines.take_rest();
        for line in rest.lines() {
            if let Some(value) = field(line, "data") {
                self.data.push(value.to_string());
            }
        }
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.event);
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: if event.is_empty() {
                "message".to_string()
            } else {
                event
            },
            data,
        })
    }
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_parser_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.push(b"event: endpoint\nda").is_empty());
        let events = parser.push(b"ta: /messages?session=1\n\ndata: {\"a\":1}\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: "endpoint".into(),
                    data: "/messages?session=1".into()
                },
                SseEvent {
                    event: "message".into(),
                    data: "{\"a\":1}".into()
                },
            ]
        );
    }

    #[test]
    fn test_sse_parser_multiline_data_and_finish() {
        let mut parser = SseParser::default();
        assert!(parser.push(b"data: one\ndata: two\n").is_empty());
        assert_eq!(parser.finish().unwrap().data, "one\ntwo");
    }

    #[test]
    fn test_sse_parser_keeps_char_split_across_chunks() {
        let bytes = "data: {\"name\":\"Über\"}\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut parser = SseParser::default();
        assert!(parser.push(&bytes[..split]).is_empty());
        let events = parser.push(&bytes[split..]);
        assert_eq!(events[0].data, "{\"name\":\"Über\"}");
    }

    #[test]
    fn test_client_rejects_bad_header() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            HttpOptions::default().client(&headers),
            Err(McpError::Config(_))
        ));
    }
}

// ABOUTME: Streamable HTTP transport for MCP communication.
// ABOUTME: POSTs JSON-RPC and accepts either a JSON body or an SSE-framed reply.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;

use super::{HttpOptions, SseParser, Transport};
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Streamable HTTP transport.
///
/// Each JSON-RPC message is POSTed to one endpoint. The server answers with
/// `application/json` or with a `text/event-stream` carrying the response.
pub struct HttpTransport {
    endpoint_url: String,
    http_client: reqwest::Client,
    request_timeout: Duration,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    /// Prepare a transport for `url`. No request is made until the first send.
    pub async fn connect(
        url: &str,
        headers: &BTreeMap<String, String>,
        options: &HttpOptions,
    ) -> Result<Self, McpError> {
        reqwest::Url::parse(url)
            .map_err(|e| McpError::Connection(format!("Invalid URL '{}': {}", url, e)))?;

        Ok(Self {
            endpoint_url: url.to_string(),
            http_client: options.client(headers)?,
            request_timeout: options.request_timeout(),
            session_id: Mutex::new(None),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn post(&self, body: String) -> Result<reqwest::Response, McpError> {
        let mut builder = self
            .http_client
            .post(&self.endpoint_url)
            .timeout(self.request_timeout)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");

        if let Some(session_id) = self.session_id.lock().await.as_ref() {
            builder = builder.header(SESSION_HEADER, session_id.clone());
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::Connection(format!("HTTP request failed: {}", e)))?;

        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().await = Some(id.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol(format!(
                "HTTP {} - {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }
}

/// Read an SSE reply until the response with `request_id` arrives.
async fn response_from_event_stream(
    response: reqwest::Response,
    request_id: u64,
) -> Result<McpResponse, McpError> {
    let mut parser = SseParser::default();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| McpError::Connection(format!("Stream failed: {}", e)))?;
        for event in parser.push(&chunk) {
            if let Some(found) = match_response(&event.data, request_id) {
                return Ok(found);
            }
        }
    }
    if let Some(found) = parser
        .finish()
        .and_then(|event| match_response(&event.data, request_id))
    {
        return Ok(found);
    }

    Err(McpError::Protocol(format!(
        "Event stream ended without a response to request {}",
        request_id
    )))
}

/// Server requests and notifications share the stream; only our answer counts.
fn match_response(data: &str, request_id: u64) -> Option<McpResponse> {
    serde_json::from_str::<McpResponse>(data)
        .ok()
        .filter(|r| r.id == request_id)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError> {
        let request_id = request.id;
        let response = self.post(serde_json::to_string(&request)?).await?;

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let mcp_response = if is_event_stream {
            response_from_event_stream(response, request_id).await?
        } else {
            let body = response
                .text()
                .await
                .map_err(|e| McpError::Protocol(format!("Failed to read response: {}", e)))?;
            serde_json::from_str::<McpResponse>(&body)
                .map_err(|e| McpError::Protocol(format!("Invalid JSON-RPC response: {}", e)))?
        };

        if mcp_response.id != request_id {
            return Err(McpError::Protocol(format!(
                "Response ID {} does not match request ID {}",
                mcp_response.id, request_id
            )));
        }
        Ok(mcp_response)
    }

    async fn notify(&self, notification: McpNotification) -> Result<(), McpError> {
        self.post(serde_json::to_string(&notification)?).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        let session = self.session_id.lock().await.take();
        // Stateful servers accept a DELETE to end the session; failure is harmless
        if let Some(id) = session {
            let _ = self
                .http_client
                .delete(&self.endpoint_url)
                .header(SESSION_HEADER, id)
                .timeout(Duration::from_secs(5))
                .send()
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_validates_url() {
        let headers = BTreeMap::new();
        let options = HttpOptions::default();
        assert!(
            HttpTransport::connect("http://localhost:8080/mcp", &headers, &options)
                .await
                .is_ok()
        );
        assert!(
            HttpTransport::connect("not-a-valid-url", &headers, &options)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_match_response_skips_other_messages() {
        let notification = r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{}}"#;
        assert!(match_response(notification, 7).is_none());

        let other = r#"{"jsonrpc":"2.0","id":6,"result":{}}"#;
        assert!(match_response(other, 7).is_none());

        let ours = r#"{"jsonrpc":"2.0","id":7,"result":{"tools":[]}}"#;
        assert!(match_response(ours, 7).is_some());
    }
}

// ABOUTME: Legacy HTTP+SSE transport for MCP communication.
// ABOUTME: Responses arrive on a GET event stream; requests are POSTed to its endpoint.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{HttpOptions, SseParser, Transport};
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<McpResponse>>>>;

/// SSE transport.
///
/// A GET with `Accept: text/event-stream` opens the server-to-client channel.
/// The first `endpoint` event names the URL that client messages are POSTed to.
pub struct SseTransport {
    endpoint_url: String,
    messages_url: String,
    http_client: reqwest::Client,
    request_timeout: Duration,
    pending: Pending,
    reader: Mutex<Option<JoinHandle<()>>>,
    stop: CancellationToken,
}

impl SseTransport {
    /// Open the event stream and wait for the server's endpoint event.
    pub async fn connect(
        url: &str,
        headers: &BTreeMap<String, String>,
        options: &HttpOptions,
    ) -> Result<Self, McpError> {
        let base = reqwest::Url::parse(url)
            .map_err(|e| McpError::Connection(format!("Invalid URL '{}': {}", url, e)))?;
        let http_client = options.client(headers)?;

        let response = http_client
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| McpError::Connection(format!("SSE connect failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(McpError::Connection(format!(
                "SSE connect failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let stop = CancellationToken::new();
        let (endpoint_tx, mut endpoint_rx) = mpsc::channel::<String>(1);

        let reader = tokio::spawn(read_events(
            response,
            Arc::clone(&pending),
            endpoint_tx,
            stop.clone(),
        ));

        let endpoint = tokio::time::timeout(Duration::from_secs(10), endpoint_rx.recv())
            .await
            .map_err(|_| McpError::Connection("Timeout waiting for endpoint event".into()))?
            .ok_or_else(|| McpError::Connection("Stream closed before endpoint event".into()))?;

        // Relative endpoints resolve against the stream URL
        let messages_url = base
            .join(&endpoint)
            .map_err(|e| McpError::Connection(format!("Failed to resolve endpoint: {}", e)))?
            .to_string();
        debug!(url, messages_url, "SSE transport connected");

        Ok(Self {
            endpoint_url: url.to_string(),
            messages_url,
            http_client,
            request_timeout: options.request_timeout(),
            pending,
            reader: Mutex::new(Some(reader)),
            stop,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn post(&self, body: String) -> Result<(), McpError> {
        let response = self
            .http_client
            .post(&self.messages_url)
            .timeout(self.request_timeout)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::Connection(format!("POST failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(McpError::Protocol(format!(
                "POST returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

async fn read_events(
    response: reqwest::Response,
    pending: Pending,
    endpoint_tx: mpsc::Sender<String>,
    stop: CancellationToken,
) {
    let mut stream = response.bytes_stream();
    let mut parser = SseParser::default();

    loop {
        let chunk = tokio::select! {
            _ = stop.cancelled() => break,
            chunk = stream.next() => chunk,
        };
        let Some(Ok(bytes)) = chunk else { break };

        for event in parser.push(&bytes) {
            match event.event.as_str() {
                "endpoint" => {
                    let _ = endpoint_tx.send(event.data).await;
                }
                "message" => {
                    if let Ok(response) = serde_json::from_str::<McpResponse>(&event.data) {
                        if let Some(tx) = pending.lock().await.remove(&response.id) {
                            let _ = tx.send(response);
                        }
                    }
                }
                other => debug!(event = other, "Ignoring SSE event"),
            }
        }
    }

    // Dropping the senders fails every waiting request
    pending.lock().await.clear();
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.post(serde_json::to_string(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(McpError::Connection("Event stream closed".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Protocol("Request timed out".into()))
            }
        }
    }

    async fn notify(&self, notification: McpNotification) -> Result<(), McpError> {
        self.post(serde_json::to_string(&notification)?).await
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        self.stop.cancel();
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let result = SseTransport::connect(
            "http://127.0.0.1:1/sse",
            &BTreeMap::new(),
            &HttpOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(McpError::Connection(_))));
    }
}

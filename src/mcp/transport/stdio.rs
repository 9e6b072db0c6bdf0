// ABOUTME: Stdio transport for MCP communication.
// ABOUTME: Spawns a subprocess and exchanges newline-delimited JSON-RPC on stdin/stdout.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::Transport;
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<McpResponse>>>>;

/// Stdio transport - one child process per server.
pub struct StdioTransport {
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    pending: Pending,
    reader: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

impl StdioTransport {
    /// Spawn `command` and start reading its stdout.
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        request_timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::Connection(format!("Failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Connection("Failed to open stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Connection("Failed to open stdout".into()))?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_responses(stdout, Arc::clone(&pending)));

        Ok(Self {
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(Some(stdin)),
            pending,
            reader: Mutex::new(Some(reader)),
            request_timeout,
        })
    }

    async fn write_line(&self, json: String) -> Result<(), McpError> {
        let mut stdin = self.stdin.lock().await;
        let stdin = stdin
            .as_mut()
            .ok_or_else(|| McpError::Connection("Server connection closed".into()))?;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }
}

async fn read_responses(stdout: ChildStdout, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match serde_json::from_str::<McpResponse>(&line) {
            Ok(response) => {
                if let Some(tx) = pending.lock().await.remove(&response.id) {
                    let _ = tx.send(response);
                }
            }
            // Server-initiated notifications and log noise
            Err(_) => debug!(line, "Ignoring non-response line from MCP server"),
        }
    }
    pending.lock().await.clear();
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.write_line(serde_json::to_string(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(McpError::Connection("Server process exited".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Protocol("Request timed out".into()))
            }
        }
    }

    async fn notify(&self, notification: McpNotification) -> Result<(), McpError> {
        self.write_line(serde_json::to_string(&notification)?).await
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        // Closing stdin asks the server to exit
        self.stdin.lock().await.take();

        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if tokio::time::timeout(Duration::from_millis(500), child.wait())
                .await
                .is_err()
            {
                let _ = child.kill().await;
            }
        }
        Ok(())
    }
}

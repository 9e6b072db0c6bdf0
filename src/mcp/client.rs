// ABOUTME: MCP client for connecting to MCP servers via stdio, SSE, or HTTP.
// ABOUTME: Handles the initialize handshake, paginated tool listing, and tool calls.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::transport::{HttpOptions, HttpTransport, SseTransport, StdioTransport, Transport};
use super::{
    McpInitializeResult, McpNotification, McpRequest, McpServerCapabilities, McpServerConfig,
    McpToolInfo, McpToolResult, McpToolsListResult, McpTransport, PROTOCOL_VERSION,
};
use crate::error::McpError;

/// Client for communicating with an MCP server.
pub struct McpClient {
    config: McpServerConfig,
    transport: Arc<dyn Transport>,
    capabilities: McpServerCapabilities,
}

impl McpClient {
    /// Open the transport for `config`.
    pub async fn connect(config: McpServerConfig, options: &HttpOptions) -> Result<Self, McpError> {
        let transport: Arc<dyn Transport> = match &config.transport {
            McpTransport::Stdio { command, args, env } => Arc::new(
                StdioTransport::connect(command, args, env, options.request_timeout()).await?,
            ),
            McpTransport::Sse { url, headers } => {
                Arc::new(SseTransport::connect(url, headers, options).await?)
            }
            McpTransport::Http { url, headers } => {
                Arc::new(HttpTransport::connect(url, headers, options).await?)
            }
        };

        Ok(Self::with_transport(config, transport))
    }

    /// Wrap an already open transport.
    pub fn with_transport(config: McpServerConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            capabilities: McpServerCapabilities::default(),
        }
    }

    /// Connect and run the initialize handshake.
    pub async fn start(config: McpServerConfig, options: &HttpOptions) -> Result<Self, McpError> {
        let mut client = Self::connect(config, options).await?;
        let init = client.initialize().await?;
        info!(
            server = client.name(),
            protocol = %init.protocol_version,
            "Connected to MCP server"
        );
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    /// Server capabilities (available after initialize).
    pub fn capabilities(&self) -> &McpServerCapabilities {
        &self.capabilities
    }

    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let response = self.transport.send(McpRequest::new(method, params)).await?;

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .result
            .ok_or_else(|| McpError::Protocol("No result in response".into()))
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<(), McpError> {
        self.transport
            .notify(McpNotification::new(method, params))
            .await
    }

    /// Initialize the MCP connection.
    pub async fn initialize(&mut self) -> Result<McpInitializeResult, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "plane-agent",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = self.request("initialize", Some(params)).await?;
        let init_result: McpInitializeResult = serde_json::from_value(result)?;
        self.capabilities = init_result.capabilities.clone();

        self.notify("notifications/initialized", None).await?;
        Ok(init_result)
    }

    pub async fn shutdown(&self) -> Result<(), McpError> {
        self.transport.shutdown().await
    }

    /// List every tool, following pagination cursors until one repeats.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let page: McpToolsListResult =
                serde_json::from_value(self.request("tools/list", params).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen.insert(next.clone()) {
                        warn!(server = self.name(), cursor = %next, "tools/list repeated a cursor; stopping");
                        break;
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }
        Ok(tools)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let result = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn ping(&self) -> Result<(), McpError> {
        self.request("ping", None).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::mcp::McpResponse;

    /// In-process transport answering from a fixed handler.
    pub struct FakeTransport {
        pub handler: Box<dyn Fn(&McpRequest) -> serde_json::Value + Send + Sync>,
        pub methods: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new(
            handler: impl Fn(&McpRequest) -> serde_json::Value + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                handler: Box::new(handler),
                methods: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError> {
            if let Ok(mut methods) = self.methods.lock() {
                methods.push(request.method.clone());
            }
            Ok(McpResponse {
                jsonrpc: "2.0".into(),
                id: request.id,
                result: Some((self.handler)(&request)),
                error: None,
            })
        }

        async fn notify(&self, notification: McpNotification) -> Result<(), McpError> {
            if let Ok(mut methods) = self.methods.lock() {
                methods.push(notification.method);
            }
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), McpError> {
            Ok(())
        }
    }

    pub fn plane_server() -> Arc<FakeTransport> {
        FakeTransport::new(|req| match req.method.as_str() {
            "initialize" => serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "plane-mcp", "version": "1.0"}
            }),
            "tools/list" => {
                let cursor = req.params.as_ref().and_then(|p| p["cursor"].as_str());
                match cursor {
                    None => serde_json::json!({
                        "tools": [{
                            "name": "create_project",
                            "description": "Create a project",
                            "inputSchema": {"type": "object"},
                            "_meta": {"_fastmcp": {"tags": ["projects"]}}
                        }],
                        "nextCursor": "page2"
                    }),
                    Some(_) => serde_json::json!({
                        "tools": [{
                            "name": "list_work_items",
                            "description": "List work items",
                            "inputSchema": {"type": "object"},
                            "_meta": {"_fastmcp": {"tags": ["work_items"]}}
                        }]
                    }),
                }
            }
            "tools/call" => {
                let params = req.params.clone().unwrap_or_default();
                serde_json::json!({
                    "content": [{"type": "text", "text": format!("{} ok", params["name"].as_str().unwrap_or(""))}],
                    "isError": false
                })
            }
            _ => serde_json::json!({}),
        })
    }
}

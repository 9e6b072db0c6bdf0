// ABOUTME: Defines MCP protocol types - JSON-RPC 2.0 messages, tool info with
// ABOUTME: tag metadata, tool results, and server connection settings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2025-03-26";

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl McpRequest {
    /// Create a new request with a process-wide increasing ID.
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl McpNotification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpRpcError>,
}

/// A JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Information about an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl McpToolInfo {
    /// Domain tags declared by the server.
    ///
    /// FastMCP servers publish them under `_meta._fastmcp.tags`; plain
    /// `_meta.tags` is accepted too.
    pub fn tags(&self) -> BTreeSet<String> {
        let Some(meta) = &self.meta else {
            return BTreeSet::new();
        };
        [&meta["_fastmcp"]["tags"], &meta["tags"]]
            .into_iter()
            .filter_map(|v| v.as_array())
            .flatten()
            .filter_map(|t| t.as_str())
            .map(|t| t.to_lowercase())
            .collect()
    }
}

/// Result of listing tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolsListResult {
    pub tools: Vec<McpToolInfo>,
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Content block in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

/// Result of calling a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<McpContentBlock>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
    #[serde(
        default,
        rename = "structuredContent",
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_content: Option<serde_json::Value>,
}

impl McpToolResult {
    /// Flatten the content blocks into model-readable text.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                McpContentBlock::Text { text } => text.clone(),
                McpContentBlock::Image { mime_type, .. } => format!("[Image: {}]", mime_type),
                McpContentBlock::Resource { resource } => resource["text"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| resource.to_string()),
                McpContentBlock::Unsupported => "[Unsupported content]".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How to reach an MCP server.
#[derive(Debug, Clone, PartialEq)]
pub enum McpTransport {
    /// Spawn a subprocess speaking JSON-RPC over stdin/stdout.
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// Legacy HTTP+SSE transport.
    Sse {
        url: String,
        headers: BTreeMap<String, String>,
    },
    /// Streamable HTTP transport.
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl McpTransport {
    /// Pick the transport for a bare URL: SSE when the URL mentions "sse",
    /// streamable HTTP otherwise.
    pub fn from_url(url: &str) -> Self {
        let url = url.to_string();
        if url.to_lowercase().contains("sse") {
            McpTransport::Sse {
                url,
                headers: BTreeMap::new(),
            }
        } else {
            McpTransport::Http {
                url,
                headers: BTreeMap::new(),
            }
        }
    }
}

/// Configuration for one MCP server.
#[derive(Debug, Clone, PartialEq)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: McpTransport,
    /// Whether the server's tools are narrowed per domain by their tags.
    pub filter_by_tag: bool,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            filter_by_tag: true,
        }
    }
}

/// Client info for MCP handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpClientInfo {
    pub name: String,
    pub version: String,
}

/// Parameters for MCP initialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpInitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: serde_json::Value,
    #[serde(rename = "clientInfo")]
    pub client_info: McpClientInfo,
}

/// Server capabilities returned from initialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerCapabilities {
    #[serde(default)]
    pub tools: Option<serde_json::Value>,
    #[serde(default)]
    pub resources: Option<serde_json::Value>,
    #[serde(default)]
    pub prompts: Option<serde_json::Value>,
}

/// Initialize result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpInitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: McpServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Option<McpClientInfo>,
}

// ABOUTME: MCP module - Model Context Protocol client implementation.
// ABOUTME: Connects to MCP servers (stdio, SSE, streamable HTTP) and proxies their tools.

mod client;
mod config;
mod proxy;
mod transport;
mod types;

pub use client::McpClient;
pub use config::{connect_all, expand_env, load_config, parse_config};
pub use proxy::{McpProxyTool, McpToolset};
pub use transport::{HttpOptions, HttpTransport, SseTransport, StdioTransport, Transport};
pub use types::*;

// ABOUTME: McpProxyTool forwards tool calls to an MCP server and carries its tags;
// ABOUTME: McpToolset exposes a connected server as a capability provider.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::{McpClient, McpToolInfo};
use crate::agent::RunContext;
use crate::error::ToolError;
use crate::tool::{Tool, ToolResult};
use crate::toolset::{CapabilityProvider, Toolset};

/// A tool that proxies calls to an MCP server.
pub struct McpProxyTool {
    client: Arc<McpClient>,
    info: McpToolInfo,
    tags: BTreeSet<String>,
}

impl McpProxyTool {
    pub fn new(client: Arc<McpClient>, info: McpToolInfo) -> Self {
        let tags = info.tags();
        Self { client, info, tags }
    }
}

#[async_trait]
impl Tool for McpProxyTool {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }

    fn schema(&self) -> serde_json::Value {
        self.info.input_schema.clone()
    }

    fn tags(&self) -> BTreeSet<String> {
        self.tags.clone()
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error> {
        let result = self.client.call_tool(&self.info.name, params).await?;

        let mut tool_result = if result.is_error {
            ToolResult::error(result.text())
        } else {
            ToolResult::text(result.text())
        };
        if let Some(structured) = result.structured_content {
            tool_result = tool_result.with_metadata("structured_content", structured);
        }
        Ok(tool_result)
    }
}

/// All tools of one MCP server.
pub struct McpToolset {
    client: Arc<McpClient>,
}

impl McpToolset {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }

    /// Wrap as a provider, filterable unless the server opted out.
    pub fn into_provider(self) -> CapabilityProvider {
        let filter = self.client.config().filter_by_tag;
        let toolset: Arc<dyn Toolset> = Arc::new(self);
        if filter {
            CapabilityProvider::Filterable(toolset)
        } else {
            CapabilityProvider::Unfilterable(toolset)
        }
    }
}

#[async_trait]
impl Toolset for McpToolset {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        let infos = self
            .client
            .list_tools()
            .await
            .map_err(|e| ToolError::Unavailable {
                toolset: self.client.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(infos
            .into_iter()
            .map(|info| Arc::new(McpProxyTool::new(Arc::clone(&self.client), info)) as Arc<dyn Tool>)
            .collect())
    }
}

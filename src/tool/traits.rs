// ABOUTME: Defines the Tool trait - the core abstraction for agent capabilities.
// ABOUTME: Tools carry a name, description, schema, domain tags, and async execute.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::ToolResult;
use crate::agent::RunContext;
use crate::llm::ToolDefinition;

/// A tool that can be executed by an agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description for the LLM.
    fn description(&self) -> &str;

    /// Returns the JSON Schema for the tool's input parameters.
    fn schema(&self) -> serde_json::Value;

    /// Domain tags used by the capability filter.
    fn tags(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// The definition sent to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.schema()).with_tags(self.tags())
    }

    /// Execute the tool with the given parameters.
    async fn execute(
        &self,
        ctx: &RunContext,
        params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error>;
}

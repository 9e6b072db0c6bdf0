// ABOUTME: Delegation handlers - one `assign_task_to_<tag>_agent` tool per domain,
// ABOUTME: forwarding a task with the caller's RunContext to the pooled domain agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::context::RunContext;
use super::pool::{DomainAgent, DomainAgentPool};
use crate::tool::{Tool, ToolResult};

/// Routes a task to one domain agent.
pub struct DelegationTool {
    name: String,
    description: String,
    target: Arc<DomainAgent>,
}

impl DelegationTool {
    pub fn new(target: Arc<DomainAgent>) -> Self {
        Self {
            name: target.spec.handler_name(),
            description: format!(
                "Assigns a task to the {} agent. {}",
                target.spec.display_name, target.spec.instructions
            ),
            target,
        }
    }

    pub fn domain(&self) -> &'static str {
        self.target.spec.tag
    }
}

#[async_trait]
impl Tool for DelegationTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "Self-contained description of the work for this domain agent"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            task: String,
        }
        let params: Params = serde_json::from_value(params)?;

        let domain = self.target.spec.display_name;
        info!(domain = self.domain(), task = %params.task, "Assigning task to {}", domain);

        match self.target.agent.run(&params.task, ctx).await {
            Ok(result) => Ok(ToolResult::text(result.output)),
            Err(e) => {
                warn!(domain = self.domain(), error = %e, "Delegated run failed");
                Ok(ToolResult::error(format!("{} agent failed: {}", domain, e)))
            }
        }
    }
}

/// One delegation tool per pooled domain, in pool order.
pub fn delegation_tools(pool: &DomainAgentPool) -> Vec<Arc<dyn Tool>> {
    pool.iter()
        .map(|agent| Arc::new(DelegationTool::new(Arc::clone(agent))) as Arc<dyn Tool>)
        .collect()
}

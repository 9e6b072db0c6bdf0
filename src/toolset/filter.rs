// ABOUTME: Capability filter - decides which tools belong to a domain, and a
// ABOUTME: FilteredToolset decorator that applies such a predicate to any toolset.

use std::sync::Arc;

use async_trait::async_trait;

use super::Toolset;
use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::tool::Tool;

/// True iff `domain_tag` matches one of the tool's tags, ignoring case.
pub fn belongs_to_domain(tool: &ToolDefinition, domain_tag: &str) -> bool {
    let tag = domain_tag.to_lowercase();
    tool.tags.iter().any(|t| t.to_lowercase() == tag)
}

type Predicate = dyn Fn(&ToolDefinition) -> bool + Send + Sync;

/// A view of another toolset exposing only the tools a predicate accepts.
pub struct FilteredToolset {
    name: String,
    source: Arc<dyn Toolset>,
    predicate: Box<Predicate>,
}

impl FilteredToolset {
    pub fn new(
        source: Arc<dyn Toolset>,
        predicate: impl Fn(&ToolDefinition) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: source.name().to_string(),
            source,
            predicate: Box::new(predicate),
        }
    }

    /// Restrict `source` to the tools tagged with `domain_tag`.
    pub fn for_domain(source: Arc<dyn Toolset>, domain_tag: &str) -> Self {
        let tag = domain_tag.to_string();
        let mut filtered = Self::new(source, move |def| belongs_to_domain(def, &tag));
        filtered.name = format!("{}[{}]", filtered.name, domain_tag);
        filtered
    }

    pub fn is_allowed(&self, def: &ToolDefinition) -> bool {
        (self.predicate)(def)
    }
}

#[async_trait]
impl Toolset for FilteredToolset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        let tools = self.source.tools().await?;
        Ok(tools
            .into_iter()
            .filter(|t| self.is_allowed(&t.definition()))
            .collect())
    }
}

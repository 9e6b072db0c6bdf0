// ABOUTME: Toolsets - groups of tools supplied by a capability provider, the
// ABOUTME: Filterable/Unfilterable provider enum, and the per-domain CapabilitySet.

mod filter;

pub use filter::{FilteredToolset, belongs_to_domain};

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::tool::Tool;

/// A source of tools, listed on demand.
#[async_trait]
pub trait Toolset: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// List the tools this toolset currently provides.
    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError>;
}

/// A fixed list of tools.
pub struct StaticToolset {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl StaticToolset {
    pub fn new(name: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            name: name.into(),
            tools,
        }
    }

    /// Snapshot another toolset's current tools.
    pub async fn snapshot(source: &dyn Toolset) -> Result<Self, ToolError> {
        Ok(Self::new(source.name(), source.tools().await?))
    }
}

#[async_trait]
impl Toolset for StaticToolset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        Ok(self.tools.clone())
    }
}

/// A capability provider, classified by whether it can be narrowed to a domain.
#[derive(Clone)]
pub enum CapabilityProvider {
    /// Tools carry domain tags and are filtered per domain.
    Filterable(Arc<dyn Toolset>),
    /// Tools are exposed to every domain unfiltered.
    Unfilterable(Arc<dyn Toolset>),
}

impl CapabilityProvider {
    pub fn toolset(&self) -> &Arc<dyn Toolset> {
        match self {
            CapabilityProvider::Filterable(ts) | CapabilityProvider::Unfilterable(ts) => ts,
        }
    }

    pub fn name(&self) -> &str {
        self.toolset().name()
    }

    /// List the provider's tools once, returning a provider of the same kind
    /// backed by the snapshot.
    pub async fn preload(&self) -> Result<CapabilityProvider, ToolError> {
        let snapshot: Arc<dyn Toolset> =
            Arc::new(StaticToolset::snapshot(self.toolset().as_ref()).await?);
        Ok(match self {
            CapabilityProvider::Filterable(_) => CapabilityProvider::Filterable(snapshot),
            CapabilityProvider::Unfilterable(_) => CapabilityProvider::Unfilterable(snapshot),
        })
    }

    /// Tools this provider contributes to `domain_tag`.
    pub async fn scoped_tools(&self, domain_tag: &str) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        match self {
            CapabilityProvider::Filterable(ts) => {
                FilteredToolset::for_domain(Arc::clone(ts), domain_tag)
                    .tools()
                    .await
            }
            CapabilityProvider::Unfilterable(ts) => {
                let tools = ts.tools().await?;
                warn!(
                    provider = ts.name(),
                    domain = domain_tag,
                    tools = tools.len(),
                    "Provider cannot be filtered by tag; exposing all of its tools to the domain"
                );
                Ok(tools)
            }
        }
    }
}

/// Ordered tools available to one agent. Immutable once built.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    tools: Vec<Arc<dyn Tool>>,
}

impl CapabilitySet {
    /// Build from tools in order; later tools with a duplicate name are dropped.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut seen = HashSet::new();
        let tools = tools
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.name().to_string());
                if !fresh {
                    warn!(tool = t.name(), "Duplicate tool name; keeping the first");
                }
                fresh
            })
            .collect();
        Self { tools }
    }

    /// Collect the tools of several toolsets, in order.
    pub async fn from_toolsets(toolsets: &[Arc<dyn Toolset>]) -> Result<Self, ToolError> {
        let mut tools = Vec::new();
        for ts in toolsets {
            tools.extend(ts.tools().await?);
        }
        Ok(Self::new(tools))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

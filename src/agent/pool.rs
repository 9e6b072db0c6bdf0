// ABOUTME: Domain agent pool - builds one agent per DomainSpec, each bound to its
// ABOUTME: tag-filtered capabilities and the skills found under the domain's skill dirs.

use std::sync::Arc;

use tracing::info;

use super::domain::DomainSpec;
use super::runner::{Agent, AgentOptions};
use crate::error::PlaneError;
use crate::llm::LlmClient;
use crate::skills::{SkillDescriptor, SkillRoots, SkillsToolset, load_skill_dirs};
use crate::tool::Tool;
use crate::toolset::{CapabilityProvider, CapabilitySet, Toolset};

/// A domain's ready-to-run agent.
#[derive(Debug)]
pub struct DomainAgent {
    pub spec: DomainSpec,
    pub agent: Agent,
    pub skills: Vec<SkillDescriptor>,
}

impl DomainAgent {
    pub fn tag(&self) -> &'static str {
        self.spec.tag
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        self.agent.tools()
    }
}

/// One agent per domain, in table order. Shared read-only across requests.
#[derive(Debug, Default)]
pub struct DomainAgentPool {
    agents: Vec<Arc<DomainAgent>>,
}

impl DomainAgentPool {
    pub fn get(&self, tag: &str) -> Option<&Arc<DomainAgent>> {
        self.agents.iter().find(|a| a.spec.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DomainAgent>> {
        self.agents.iter()
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.agents.iter().map(|a| a.spec.tag).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Build the pool.
///
/// Every provider is listed exactly once, before any domain is built; a
/// listing failure aborts the whole build.
pub async fn build_pool(
    specs: &[DomainSpec],
    providers: &[CapabilityProvider],
    client: Arc<dyn LlmClient>,
    options: &AgentOptions,
    roots: &SkillRoots,
) -> Result<DomainAgentPool, PlaneError> {
    let mut loaded = Vec::with_capacity(providers.len());
    for provider in providers {
        let snapshot = provider.preload().await?;
        info!(provider = provider.name(), "Loaded capability provider");
        loaded.push(snapshot);
    }

    let mut agents = Vec::with_capacity(specs.len());
    for spec in specs {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        for provider in &loaded {
            tools.extend(provider.scoped_tools(spec.tag).await?);
        }

        let skills = load_skill_dirs(&roots.domain_dirs(spec.tag))?;
        let mut instructions = spec.instructions.to_string();
        if !skills.is_empty() {
            let toolset = SkillsToolset::new(format!("{}-skills", spec.tag), skills.clone());
            if let Some(section) = toolset.library().prompt_section() {
                instructions = format!("{}\n\n{}", instructions, section);
            }
            tools.extend(toolset.tools().await?);
        }

        let capabilities = CapabilitySet::new(tools);
        info!(
            domain = spec.tag,
            tools = capabilities.len(),
            skills = skills.len(),
            "Built domain agent"
        );

        let agent = Agent::new(
            spec.agent_name(),
            instructions,
            Arc::clone(&client),
            capabilities,
            options.clone(),
        );
        agents.push(Arc::new(DomainAgent {
            spec: *spec,
            agent,
            skills,
        }));
    }

    Ok(DomainAgentPool { agents })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::agent::domain::{DOMAINS, find_domain};
    use crate::error::ToolError;
    use crate::llm::mock::MockClient;
    use crate::toolset::StaticToolset;
    use crate::toolset::belongs_to_domain;
    use crate::toolset::test_support::TaggedTool;

    struct CountingToolset {
        inner: StaticToolset,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Toolset for CountingToolset {
        fn name(&self) -> &str {
            "plane-mcp"
        }

        async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.tools().await
        }
    }

    struct BrokenToolset;

    #[async_trait]
    impl Toolset for BrokenToolset {
        fn name(&self) -> &str {
            "broken"
        }

        async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
            Err(ToolError::Unavailable {
                toolset: "broken".into(),
                reason: "connection refused".into(),
            })
        }
    }

    fn plane_provider(calls: Arc<AtomicUsize>) -> CapabilityProvider {
        CapabilityProvider::Filterable(Arc::new(CountingToolset {
            inner: StaticToolset::new(
                "plane-mcp",
                vec![
                    TaggedTool::arc("create_project", &["projects"]),
                    TaggedTool::arc("list_work_items", &["work_items"]),
                    TaggedTool::arc("add_cycle_project", &["Projects", "cycles"]),
                    TaggedTool::arc("untagged", &[]),
                ],
            ),
            calls,
        }))
    }

    fn roots() -> SkillRoots {
        SkillRoots::new("/nonexistent/skills")
    }

    #[tokio::test]
    async fn test_one_agent_per_domain_with_scoped_tools() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = build_pool(
            DOMAINS,
            &[plane_provider(Arc::clone(&calls))],
            Arc::new(MockClient::always("ok")),
            &AgentOptions::new("m"),
            &roots(),
        )
        .await
        .unwrap();

        assert_eq!(pool.len(), DOMAINS.len());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        for domain in pool.iter() {
            for tool in domain.capabilities().iter() {
                assert!(belongs_to_domain(&tool.definition(), domain.tag()));
            }
        }

        let projects = pool.get("projects").unwrap();
        assert_eq!(
            projects.capabilities().names(),
            vec!["create_project", "add_cycle_project"]
        );
        assert_eq!(projects.agent.name(), "Plane_Projects_Agent");
        assert_eq!(pool.get("cycles").unwrap().capabilities().len(), 1);
    }

    #[tokio::test]
    async fn test_domain_without_tools_or_skills_is_valid() {
        let pool = build_pool(
            DOMAINS,
            &[],
            Arc::new(MockClient::always("nothing to do")),
            &AgentOptions::new("m"),
            &roots(),
        )
        .await
        .unwrap();

        let pages = pool.get("pages").unwrap();
        assert!(pages.capabilities().is_empty());
        assert!(pages.skills.is_empty());

        let result = pages
            .agent
            .run("make a page", &crate::agent::RunContext::new())
            .await
            .unwrap();
        assert_eq!(result.output, "nothing to do");
    }

    #[tokio::test]
    async fn test_unfilterable_provider_reaches_every_domain() {
        let raw = CapabilityProvider::Unfilterable(Arc::new(StaticToolset::new(
            "legacy",
            vec![TaggedTool::arc("raw_query", &[])],
        )));
        let pool = build_pool(
            DOMAINS,
            &[raw],
            Arc::new(MockClient::always("ok")),
            &AgentOptions::new("m"),
            &roots(),
        )
        .await
        .unwrap();

        assert!(pool.iter().all(|d| d.capabilities().get("raw_query").is_some()));
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_build() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = build_pool(
            DOMAINS,
            &[
                plane_provider(calls),
                CapabilityProvider::Filterable(Arc::new(BrokenToolset)),
            ],
            Arc::new(MockClient::always("ok")),
            &AgentOptions::new("m"),
            &roots(),
        )
        .await;

        assert!(matches!(result, Err(PlaneError::Tool(ToolError::Unavailable { .. }))));
    }

    #[tokio::test]
    async fn test_domain_skills_from_custom_then_default() {
        let default = tempfile::tempdir().unwrap();
        let custom = tempfile::tempdir().unwrap();
        for (root, name) in [(&default, "Default Triage"), (&custom, "Custom Triage")] {
            let dir = root.path().join("plane-work-items").join("triage");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join("SKILL.md"),
                format!("---\nname: {}\ndescription: Sort new items\n---\nSteps.", name),
            )
            .unwrap();
        }
        let roots = SkillRoots::new(default.path()).with_custom(custom.path());

        let pool = build_pool(
            &[*find_domain("work_items").unwrap(), *find_domain("labels").unwrap()],
            &[],
            Arc::new(MockClient::always("ok")),
            &AgentOptions::new("m"),
            &roots,
        )
        .await
        .unwrap();

        let work_items = pool.get("work_items").unwrap();
        assert_eq!(work_items.skills.len(), 1);
        assert_eq!(work_items.skills[0].name, "Custom Triage");
        assert!(work_items.capabilities().get("load_skill").is_some());
        assert!(work_items.agent.instructions().contains("triage: Sort new items"));

        assert!(pool.get("labels").unwrap().capabilities().is_empty());
    }
}

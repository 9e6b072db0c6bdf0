// ABOUTME: Supervisor - the top-level router agent whose tools are the delegation
// ABOUTME: handlers plus the skills toolset over the default and custom skill roots.

use std::sync::Arc;

use tracing::info;

use super::context::RunContext;
use super::delegation::delegation_tools;
use super::domain::{DomainSpec, SUPERVISOR_SYSTEM_PROMPT};
use super::pool::{DomainAgentPool, build_pool};
use super::runner::{Agent, AgentEventStream, AgentOptions, Conversation, RunResult};
use crate::error::{PlaneError, RunError};
use crate::llm::LlmClient;
use crate::skills::{SkillDescriptor, SkillRoots, SkillsToolset, load_skill_dirs};
use crate::toolset::{CapabilityProvider, CapabilitySet, Toolset};

pub const SUPERVISOR_NAME: &str = "Plane_Supervisor_Agent";

/// Everything needed to assemble the agent system.
pub struct SupervisorParams<'a> {
    pub domains: &'a [DomainSpec],
    pub providers: &'a [CapabilityProvider],
    pub client: Arc<dyn LlmClient>,
    pub options: AgentOptions,
    pub skill_roots: SkillRoots,
    /// Replaces the default supervisor prompt.
    pub instructions: Option<String>,
}

/// The supervisor and the domain agents it routes to.
pub struct Supervisor {
    agent: Agent,
    pool: Arc<DomainAgentPool>,
    skills: Vec<SkillDescriptor>,
}

impl Supervisor {
    /// Build the domain pool and the supervisor on top of it.
    pub async fn build(params: SupervisorParams<'_>) -> Result<Self, PlaneError> {
        let pool = build_pool(
            params.domains,
            params.providers,
            Arc::clone(&params.client),
            &params.options,
            &params.skill_roots,
        )
        .await?;
        Self::with_pool(
            pool,
            params.client,
            params.options,
            &params.skill_roots,
            params.instructions,
        )
        .await
    }

    /// Build a supervisor over an existing pool.
    pub async fn with_pool(
        pool: DomainAgentPool,
        client: Arc<dyn LlmClient>,
        options: AgentOptions,
        skill_roots: &SkillRoots,
        instructions: Option<String>,
    ) -> Result<Self, PlaneError> {
        let mut tools = delegation_tools(&pool);
        let mut instructions = instructions
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| SUPERVISOR_SYSTEM_PROMPT.to_string());

        let skills = load_skill_dirs(&skill_roots.supervisor_dirs())?;
        if !skills.is_empty() {
            let toolset = SkillsToolset::new("supervisor-skills", skills.clone());
            if let Some(section) = toolset.library().prompt_section() {
                instructions = format!("{}\n\n{}", instructions, section);
            }
            tools.extend(toolset.tools().await?);
        }

        info!(
            domains = pool.len(),
            skills = skills.len(),
            "Supervisor ready"
        );

        let agent = Agent::new(
            SUPERVISOR_NAME,
            instructions,
            client,
            CapabilitySet::new(tools),
            options,
        );
        Ok(Self {
            agent,
            pool: Arc::new(pool),
            skills,
        })
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn pool(&self) -> &Arc<DomainAgentPool> {
        &self.pool
    }

    /// Skills found under the default and custom roots.
    pub fn skills(&self) -> &[SkillDescriptor] {
        &self.skills
    }

    pub async fn run(&self, task: &str, ctx: &RunContext) -> Result<RunResult, RunError> {
        self.agent.run(task, ctx).await
    }

    pub async fn run_conversation(
        &self,
        conversation: Conversation,
        ctx: &RunContext,
    ) -> Result<RunResult, RunError> {
        self.agent.run_conversation(conversation, ctx).await
    }

    pub fn run_stream(&self, conversation: Conversation, ctx: RunContext) -> AgentEventStream<'_> {
        self.agent.run_stream(conversation, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::domain::DOMAINS;
    use crate::llm::mock::{MockClient, text_response, tool_calls_response, tool_results};

    fn params(client: MockClient, roots: SkillRoots) -> SupervisorParams<'static> {
        SupervisorParams {
            domains: DOMAINS,
            providers: &[],
            client: Arc::new(client),
            options: AgentOptions::new("m"),
            skill_roots: roots,
            instructions: None,
        }
    }

    #[tokio::test]
    async fn test_supervisor_exposes_one_handler_per_domain() {
        let supervisor = Supervisor::build(params(
            MockClient::always("hi"),
            SkillRoots::new("/nonexistent"),
        ))
        .await
        .unwrap();

        assert_eq!(supervisor.agent().tools().len(), DOMAINS.len());
        assert!(supervisor
            .agent()
            .tools()
            .get("assign_task_to_work_item_relations_agent")
            .is_some());
        assert!(supervisor.skills().is_empty());
        assert_eq!(supervisor.agent().instructions(), SUPERVISOR_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_supervisor_delegates_and_synthesizes() {
        let client = MockClient::new(|req| {
            let system = req.system.clone().unwrap_or_default();
            if system.contains("Supervisor") {
                match tool_results(req).as_slice() {
                    [] => Ok(tool_calls_response(&[(
                        "c1",
                        "assign_task_to_labels_agent",
                        serde_json::json!({"task": "create label bug"}),
                    )])),
                    [(text, false)] => Ok(text_response(&format!("Summary: {}", text))),
                    other => panic!("unexpected {:?}", other),
                }
            } else {
                Ok(text_response("label bug created"))
            }
        });
        let supervisor = Supervisor::build(params(client, SkillRoots::new("/nonexistent")))
            .await
            .unwrap();
        let ctx = RunContext::new();

        let result = supervisor.run("add a bug label", &ctx).await.unwrap();
        assert_eq!(result.output, "Summary: label bug created");
        assert_eq!(result.usage.requests, 3);
    }

    #[tokio::test]
    async fn test_custom_prompt_and_supervisor_skills() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("plane-projects");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            "---\nname: Projects\ndescription: Project playbook\n---\nBody",
        )
        .unwrap();

        let mut params = params(MockClient::always("ok"), SkillRoots::new(root.path()));
        params.instructions = Some("Route carefully.".into());
        let supervisor = Supervisor::build(params).await.unwrap();

        assert_eq!(supervisor.skills().len(), 1);
        assert!(supervisor.agent().instructions().starts_with("Route carefully."));
        assert!(supervisor.agent().tools().get("list_skills").is_some());
        // The projects agent finds the same skill through its domain directory
        assert_eq!(supervisor.pool().get("projects").unwrap().skills.len(), 1);
    }
}

// ABOUTME: Agent orchestration - the think-act runner, the domain table and pool,
// ABOUTME: per-domain delegation handlers, and the supervisor that routes between them.

mod context;
mod delegation;
mod domain;
mod pool;
mod runner;
mod supervisor;

pub use context::{RunContext, RunUsage, UsageTracker};
pub use delegation::{DelegationTool, delegation_tools};
pub use domain::{
    AGENT_DESCRIPTION, AGENT_NAME, DOMAINS, DomainSpec, SUPERVISOR_SYSTEM_PROMPT, find_domain,
};
pub use pool::{DomainAgent, DomainAgentPool, build_pool};
pub use runner::{
    Agent, AgentEvent, AgentEventStream, AgentOptions, Conversation, DEFAULT_MAX_ITERATIONS,
    RunResult,
};
pub use supervisor::{SUPERVISOR_NAME, Supervisor, SupervisorParams};

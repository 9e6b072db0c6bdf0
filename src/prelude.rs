// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use plane_agent::prelude::*;` to get started quickly.

pub use crate::agent::{
    Agent, AgentEvent, AgentOptions, Conversation, DOMAINS, DomainSpec, RunContext, RunResult,
    Supervisor, SupervisorParams,
};
pub use crate::config::Config;
pub use crate::error::{
    ConfigError, LlmError, McpError, PlaneError, RunError, SkillError, ToolError,
};
pub use crate::llm::{
    AnthropicClient, ContentBlock, LlmClient, Message, ModelSettings, OpenAIClient, Provider,
    Request, Response, Role, StopReason, StreamEvent, ToolDefinition, Usage, create_client,
};
pub use crate::mcp::{HttpOptions, McpClient, McpServerConfig, McpToolset, McpTransport};
pub use crate::server::{ServerOptions, build_router};
pub use crate::skills::{SkillDescriptor, SkillRoots, SkillsToolset};
pub use crate::tool::{Tool, ToolResult};
pub use crate::toolset::{CapabilityProvider, CapabilitySet, Toolset};
pub use crate::ui::{EventEncoding, RunAgentInput, UiAdapter, UiEvent};

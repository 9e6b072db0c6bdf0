// ABOUTME: Defines all error types for plane-agent using thiserror.
// ABOUTME: Each subsystem has its own error enum, unified under PlaneError.

use std::time::Duration;

/// Top-level error type for building and running the agent system.
#[derive(Debug, thiserror::Error)]
pub enum PlaneError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream closed unexpectedly")]
    StreamClosed,

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors from tool and toolset operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Toolset '{toolset}' unavailable: {reason}")]
    Unavailable { toolset: String, reason: String },

    #[error("Execution failed: {0}")]
    Execution(#[source] anyhow::Error),
}

/// Errors from MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Invalid server config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from skill discovery and loading.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid SKILL.md at {path}: {message}")]
    Format { path: String, message: String },

    #[error("Skill not found: {0}")]
    NotFound(String),

    #[error("Resource '{resource}' is outside skill '{skill}'")]
    OutsideSkill { skill: String, resource: String },
}

/// Errors that end an agent run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Agent '{agent}' exceeded max iterations ({limit})")]
    IterationLimit { agent: String, limit: usize },

    #[error("Run timed out after {0:?}")]
    Timeout(Duration),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Nothing to run: conversation is empty")]
    EmptyConversation,
}

/// Errors from resolving configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ABOUTME: Command-line and environment configuration for the plane-agent server,
// ABOUTME: resolved into model settings, agent options, skill roots and MCP servers.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use clap::builder::BoolishValueParser;

use crate::agent::{AgentOptions, DEFAULT_MAX_ITERATIONS};
use crate::error::{ConfigError, PlaneError};
use crate::llm::{ModelSettings, Provider};
use crate::mcp::{HttpOptions, McpServerConfig, McpTransport, load_config};
use crate::server::ServerOptions;
use crate::skills::SkillRoots;
use crate::ui::DEFAULT_MAX_MESSAGE_BYTES;

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Server configuration. Every flag falls back to its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "plane-agent", version, about = "Plane supervisor agent server")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 9000)]
    pub port: u16,

    /// URL advertised in the A2A agent card. Derived from host and port when unset.
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    #[arg(long, env = "PROVIDER", value_enum, default_value_t = Provider::Openai)]
    pub provider: Provider,

    #[arg(long, env = "MODEL_ID", default_value = "qwen/qwen3-coder-next")]
    pub model_id: String,

    #[arg(long, env = "LLM_BASE_URL", default_value = "http://host.docker.internal:1234/v1")]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_API_KEY", default_value = "ollama", hide_env_values = true)]
    pub llm_api_key: String,

    /// Single MCP server URL. Wins over --mcp-config.
    #[arg(long, env = "MCP_URL")]
    pub mcp_url: Option<String>,

    /// JSON file in the `mcpServers` format.
    #[arg(long, env = "MCP_CONFIG")]
    pub mcp_config: Option<PathBuf>,

    #[arg(long, env = "SKILLS_DIRECTORY", default_value = "skills")]
    pub skills_directory: PathBuf,

    #[arg(long, env = "CUSTOM_SKILLS_DIRECTORY")]
    pub custom_skills_directory: Option<PathBuf>,

    #[arg(long, env = "SSL_VERIFY", action = ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "true")]
    pub ssl_verify: bool,

    /// Skip TLS certificate verification.
    #[arg(long)]
    pub insecure: bool,

    #[arg(long, env = "MAX_TOKENS", default_value_t = 16384)]
    pub max_tokens: u32,

    #[arg(long, env = "TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f64,

    #[arg(long, env = "TOP_P", default_value_t = 1.0)]
    pub top_p: f64,

    /// Seconds allowed for a whole agent run and for each model HTTP call.
    #[arg(long, env = "TIMEOUT", default_value_t = 32400)]
    pub timeout: u64,

    /// Seconds allowed for a single tool call.
    #[arg(long, env = "TOOL_TIMEOUT", default_value_t = 32400)]
    pub tool_timeout: u64,

    #[arg(long, env = "PARALLEL_TOOL_CALLS", action = ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "true")]
    pub parallel_tool_calls: bool,

    #[arg(long, env = "SEED")]
    pub seed: Option<i64>,

    #[arg(long, env = "PRESENCE_PENALTY", default_value_t = 0.0)]
    pub presence_penalty: f64,

    #[arg(long, env = "FREQUENCY_PENALTY", default_value_t = 0.0)]
    pub frequency_penalty: f64,

    /// JSON object of token id to bias.
    #[arg(long, env = "LOGIT_BIAS")]
    pub logit_bias: Option<String>,

    /// Comma-separated stop sequences.
    #[arg(long, env = "STOP_SEQUENCES")]
    pub stop_sequences: Option<String>,

    /// JSON object of headers added to every model request.
    #[arg(long, env = "EXTRA_HEADERS")]
    pub extra_headers: Option<String>,

    /// JSON object merged into every model request body.
    #[arg(long, env = "EXTRA_BODY")]
    pub extra_body: Option<String>,

    #[arg(long, env = "MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    #[arg(long, env = "MAX_MESSAGE_BYTES", default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,

    #[arg(long, env = "SUPERVISOR_SYSTEM_PROMPT")]
    pub supervisor_system_prompt: Option<String>,
}

fn json_object(field: &'static str, raw: Option<&str>) -> Result<Option<JsonObject>, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(ConfigError::Invalid {
            field,
            message: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            field,
            message: e.to_string(),
        }),
    }
}

impl Config {
    pub fn verify_tls(&self) -> bool {
        self.ssl_verify && !self.insecure
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|e| ConfigError::Invalid {
            field: "HOST",
            message: format!("'{}': {}", self.host, e),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn advertised_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let host = match self.host.as_str() {
                    "0.0.0.0" | "::" => "localhost",
                    other => other,
                };
                format!("http://{}:{}", host, self.port)
            }
        }
    }

    pub fn model_settings(&self) -> Result<ModelSettings, ConfigError> {
        let extra_headers = json_object("EXTRA_HEADERS", self.extra_headers.as_deref())?
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| match value {
                serde_json::Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect();

        let stop_sequences = self
            .stop_sequences
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ModelSettings {
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
            timeout: Some(Duration::from_secs(self.timeout)),
            parallel_tool_calls: Some(self.parallel_tool_calls),
            seed: self.seed,
            presence_penalty: Some(self.presence_penalty),
            frequency_penalty: Some(self.frequency_penalty),
            logit_bias: json_object("LOGIT_BIAS", self.logit_bias.as_deref())?,
            stop_sequences,
            extra_headers,
            extra_body: json_object("EXTRA_BODY", self.extra_body.as_deref())?,
        })
    }

    pub fn agent_options(&self) -> Result<AgentOptions, ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "MAX_ITERATIONS",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(AgentOptions::new(&self.model_id)
            .settings(self.model_settings()?)
            .max_iterations(self.max_iterations)
            .tool_timeout(Duration::from_secs(self.tool_timeout))
            .run_timeout(Duration::from_secs(self.timeout)))
    }

    pub fn skill_roots(&self) -> SkillRoots {
        let roots = SkillRoots::new(&self.skills_directory);
        match &self.custom_skills_directory {
            Some(custom) => roots.with_custom(custom),
            None => roots,
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            ssl_verify: self.verify_tls(),
            timeout: Some(Duration::from_secs(self.tool_timeout)),
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            public_url: self.advertised_url(),
            max_message_bytes: self.max_message_bytes,
        }
    }

    /// MCP servers to connect at startup. `MCP_URL` wins over `MCP_CONFIG`.
    pub fn mcp_servers(&self) -> Result<Vec<McpServerConfig>, PlaneError> {
        if let Some(url) = self.mcp_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(vec![McpServerConfig::new("plane", McpTransport::from_url(url))]);
        }
        match &self.mcp_config {
            Some(path) => Ok(load_config(path)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn supervisor_prompt(&self) -> Option<String> {
        self.supervisor_system_prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
    }
}

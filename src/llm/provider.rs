// ABOUTME: Provider selection and client construction.
// ABOUTME: Maps a provider name onto a configured LlmClient implementation.

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use super::{ANTHROPIC_BASE_URL, AnthropicClient, LlmClient, OPENAI_BASE_URL, OpenAIClient};
use crate::error::LlmError;

/// Model providers the agent can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Openai,
    Anthropic,
    Google,
    Huggingface,
    Groq,
    Mistral,
    Ollama,
}

impl Provider {
    /// Endpoint used when no base URL is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Openai => OPENAI_BASE_URL,
            Provider::Anthropic => ANTHROPIC_BASE_URL,
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Huggingface => "https://router.huggingface.co/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Mistral => "https://api.mistral.ai/v1",
            Provider::Ollama => "http://localhost:11434/v1",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        f.write_str(&name)
    }
}

/// Build the shared HTTP client for model calls.
pub fn http_client(ssl_verify: bool, timeout: Option<Duration>) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(!ssl_verify);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Construct a client for `provider`.
///
/// Every provider except Anthropic speaks the OpenAI chat-completions format.
/// `base_url` overrides the provider's public endpoint.
pub fn create_client(
    provider: Provider,
    base_url: Option<&str>,
    api_key: Option<&str>,
    http: reqwest::Client,
) -> Arc<dyn LlmClient> {
    let base_url = base_url
        .filter(|u| !u.is_empty())
        .unwrap_or(provider.default_base_url());
    let api_key = api_key.unwrap_or_default();

    match provider {
        Provider::Anthropic => Arc::new(
            AnthropicClient::new(api_key)
                .with_base_url(base_url)
                .with_http_client(http),
        ),
        _ => Arc::new(
            OpenAIClient::new(api_key)
                .with_base_url(base_url)
                .with_http_client(http),
        ),
    }
}

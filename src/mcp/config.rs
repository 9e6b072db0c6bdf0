// ABOUTME: Multi-server MCP configuration document: parsing, ${VAR} expansion,
// ABOUTME: and connecting every configured server as a capability provider.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use super::transport::HttpOptions;
use super::{McpClient, McpServerConfig, McpToolset, McpTransport};
use crate::error::McpError;
use crate::toolset::CapabilityProvider;

const ENV_REF: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McpConfigFile {
    mcp_servers: BTreeMap<String, ServerEntry>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default = "default_true", rename = "filterByTag")]
        filter_by_tag: bool,
    },
    Remote {
        url: String,
        #[serde(default)]
        transport: Option<String>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default = "default_true", rename = "filterByTag")]
        filter_by_tag: bool,
    },
}

impl ServerEntry {
    fn into_config(self, name: String) -> Result<McpServerConfig, McpError> {
        let (transport, filter_by_tag) = match self {
            ServerEntry::Stdio {
                command,
                args,
                env,
                filter_by_tag,
            } => (McpTransport::Stdio { command, args, env }, filter_by_tag),
            ServerEntry::Remote {
                url,
                transport,
                headers,
                filter_by_tag,
            } => {
                let transport = match transport.as_deref() {
                    None => match McpTransport::from_url(&url) {
                        McpTransport::Sse { url, .. } => McpTransport::Sse { url, headers },
                        _ => McpTransport::Http { url, headers },
                    },
                    Some("sse") => McpTransport::Sse { url, headers },
                    Some("http" | "streamable-http" | "streamable_http") => {
                        McpTransport::Http { url, headers }
                    }
                    Some(other) => {
                        return Err(McpError::Config(format!(
                            "Server '{}': unknown transport '{}'",
                            name, other
                        )));
                    }
                };
                (transport, filter_by_tag)
            }
        };

        Ok(McpServerConfig {
            name,
            transport,
            filter_by_tag,
        })
    }
}

/// Replace `${VAR}` and `${VAR:-default}` in every string of `value`.
///
/// A reference to an unset variable without a default is an error.
pub fn expand_env(
    value: &mut serde_json::Value,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<(), McpError> {
    let pattern = Regex::new(ENV_REF).map_err(|e| McpError::Config(e.to_string()))?;
    expand_value(&pattern, value, lookup)
}

fn expand_value(
    pattern: &Regex,
    value: &mut serde_json::Value,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<(), McpError> {
    match value {
        serde_json::Value::String(s) => {
            if pattern.is_match(s) {
                *s = expand_str(pattern, s, lookup)?;
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                expand_value(pattern, item, lookup)?;
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                expand_value(pattern, item, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn expand_str(
    pattern: &Regex,
    s: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, McpError> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in pattern.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = match (lookup(name.as_str()), caps.get(2)) {
            (Some(v), _) => v,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                return Err(McpError::Config(format!(
                    "Environment variable '{}' is not set",
                    name.as_str()
                )));
            }
        };
        out.push_str(&s[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}

/// Parse a config document, expanding variables through `lookup`.
pub fn parse_config(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<McpServerConfig>, McpError> {
    let mut raw: serde_json::Value = serde_json::from_str(text)?;
    expand_env(&mut raw, lookup)?;
    let file: McpConfigFile = serde_json::from_value(raw)
        .map_err(|e| McpError::Config(format!("Invalid MCP config: {}", e)))?;

    file.mcp_servers
        .into_iter()
        .map(|(name, entry)| entry.into_config(name))
        .collect()
}

/// Read and parse a config file, expanding from the process environment.
pub fn load_config(path: &Path) -> Result<Vec<McpServerConfig>, McpError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        McpError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_config(&text, &|name| std::env::var(name).ok())
}

/// Connect and initialize every server. Any failure aborts startup.
pub async fn connect_all(
    configs: Vec<McpServerConfig>,
    options: &HttpOptions,
) -> Result<Vec<CapabilityProvider>, McpError> {
    let mut providers = Vec::with_capacity(configs.len());
    for config in configs {
        let name = config.name.clone();
        let client = McpClient::start(config, options).await.map_err(|e| {
            McpError::Connection(format!("MCP server '{}': {}", name, e))
        })?;
        info!(server = %name, "Registered MCP toolset");
        providers.push(McpToolset::new(Arc::new(client)).into_provider());
    }
    Ok(providers)
}

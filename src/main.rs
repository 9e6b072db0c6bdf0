// ABOUTME: plane-agent server binary - loads configuration, connects MCP servers,
// ABOUTME: builds the supervisor and serves AG-UI and A2A over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use plane_agent::agent::{DOMAINS, Supervisor, SupervisorParams};
use plane_agent::config::Config;
use plane_agent::llm::{create_client, http_client};
use plane_agent::mcp::connect_all;
use plane_agent::server::{build_router, serve};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    // RUST_LOG wins over --debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        provider = %config.provider,
        model = %config.model_id,
        "Starting plane-agent"
    );

    let options = config.agent_options()?;
    let http = http_client(config.verify_tls(), options.settings.timeout)?;
    let client = create_client(
        config.provider,
        Some(&config.llm_base_url),
        Some(&config.llm_api_key),
        http,
    );

    let servers = config.mcp_servers()?;
    if servers.is_empty() {
        warn!("No MCP server configured (set MCP_URL or MCP_CONFIG); domain agents will have no Plane tools");
    }
    let providers = connect_all(servers, &config.http_options())
        .await
        .context("connecting MCP servers")?;

    let supervisor = Supervisor::build(SupervisorParams {
        domains: DOMAINS,
        providers: &providers,
        client,
        options,
        skill_roots: config.skill_roots(),
        instructions: config.supervisor_prompt(),
    })
    .await
    .context("building agents")?;

    let app = build_router(Arc::new(supervisor), &config.server_options());
    serve(config.bind_addr()?, app).await?;
    Ok(())
}

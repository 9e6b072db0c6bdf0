// ABOUTME: HTTP application - health, AG-UI streaming and the A2A JSON-RPC mount,
// ABOUTME: wrapped in permissive CORS and request tracing.

mod a2a;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Supervisor;
use crate::ui::{DEFAULT_MAX_MESSAGE_BYTES, UiAdapter};

pub use a2a::{
    A2A_PROTOCOL_VERSION, A2aMessage, A2aService, AgentCapabilities, AgentCard, Artifact,
    INVALID_PARAMS, INVALID_REQUEST, JsonRpcError, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, Part, TASK_NOT_CANCELABLE, TASK_NOT_FOUND, Task, TaskState, TaskStatus,
    fallback_skill,
};
pub use routes::{AppState, ag_ui, health};

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Public base URL advertised in the agent card.
    pub public_url: String,
    pub max_message_bytes: usize,
}

impl ServerOptions {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Build the router serving `supervisor`.
pub fn build_router(supervisor: Arc<Supervisor>, options: &ServerOptions) -> Router {
    let a2a_url = format!("{}/a2a/", options.public_url.trim_end_matches('/'));
    let card = AgentCard::new(a2a_url, supervisor.skills());
    let a2a = Arc::new(A2aService::new(Arc::clone(&supervisor), card));

    let state = Arc::new(AppState {
        adapter: UiAdapter::new(supervisor).with_max_message_bytes(options.max_message_bytes),
    });

    Router::new()
        .route("/health", get(health))
        .route("/ag-ui", post(ag_ui))
        .with_state(state)
        .merge(a2a::router(a2a))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Plane agent listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

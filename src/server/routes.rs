// ABOUTME: Axum handlers for the health check and the AG-UI streaming endpoint.
// ABOUTME: Validation failures answer 422 before any agent work starts.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use futures::StreamExt;
use serde_json::json;
use tracing::info;

use crate::ui::UiAdapter;

pub struct AppState {
    pub adapter: UiAdapter,
}

// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

// POST /ag-ui
pub async fn ag_ui(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let accept = headers.get(ACCEPT).and_then(|v| v.to_str().ok());
    match state.adapter.adapt(&body, accept) {
        Ok(stream) => {
            info!(encoding = ?stream.encoding, "AG-UI run accepted");
            let body = Body::from_stream(stream.frames.map(Ok::<_, Infallible>));
            (
                [
                    (CONTENT_TYPE, stream.encoding.content_type()),
                    (CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, Json(e)).into_response(),
    }
}

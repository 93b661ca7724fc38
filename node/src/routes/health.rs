use crate::messaging::PROFILES;
use crate::state::AppState;
use crate::storage::StorePath;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    build_id: String,
    typing_debounce_ms: u64,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// Reports `degraded` when the store cannot serve a read.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let readable = match StorePath::root(PROFILES) {
        Ok(path) => state.store().get(&path).await.map(|_| ()),
        Err(err) => Err(err),
    };
    let status = match readable {
        Ok(()) => "ok",
        Err(err) => {
            warn!(%err, "store health probe failed");
            "degraded"
        }
    };
    Json(HealthResponse {
        status,
        build_id: state.build_id().to_string(),
        typing_debounce_ms: state.config().typing_debounce.as_millis() as u64,
    })
}

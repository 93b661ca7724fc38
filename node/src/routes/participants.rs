use super::ApiError;
use crate::messaging::PROFILES;
use crate::state::AppState;
use crate::storage::{Snapshot, StorePath};
use axum::extract::{Path, State};
use axum::{routing::get, Json, Router};
use duochat_messaging::{ParticipantId, Roster};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/participants/:id/contacts", get(contacts))
}

/// The caller's own profile and everyone they can open a conversation with.
async fn contacts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Roster>, ApiError> {
    let current = ParticipantId::new(id)?;
    let path = StorePath::root(PROFILES)?;
    let profiles = Snapshot::new(path.clone(), state.store().get(&path).await?);
    let roster = Roster::split(profiles.children().into_iter().map(|(_, v)| v), &current);
    Ok(Json(roster))
}

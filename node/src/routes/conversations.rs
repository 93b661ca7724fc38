use super::ApiError;
use crate::messaging::{
    conversation_path, typing_path, MessagePublisher, PublishError, SendOutcome,
};
use crate::state::AppState;
use crate::storage::Snapshot;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use duochat_messaging::{project_feed, ConversationKey, FeedEntry, ParticipantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct SendPayload {
    pub sender: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct TypingPayload {
    pub typing: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/conversations/:a/:b/messages",
            get(list_messages).post(send_message),
        )
        .route("/conversations/:a/:b/typing/:id", put(set_typing))
}

struct Pair {
    a: ParticipantId,
    b: ParticipantId,
    key: ConversationKey,
}

impl Pair {
    fn parse(a: String, b: String) -> Result<Self, ApiError> {
        let a = ParticipantId::new(a)?;
        let b = ParticipantId::new(b)?;
        let key = ConversationKey::resolve(&a, &b)?;
        Ok(Self { a, b, key })
    }

    /// The other participant, if `id` belongs to this conversation.
    fn counterpart(&self, id: &ParticipantId) -> Result<&ParticipantId, ApiError> {
        if id == &self.a {
            Ok(&self.b)
        } else if id == &self.b {
            Ok(&self.a)
        } else {
            Err(ApiError::bad_request(format!(
                "{id} is not part of conversation {}",
                self.key
            )))
        }
    }
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path((a, b)): Path<(String, String)>,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    let pair = Pair::parse(a, b)?;
    let path = conversation_path(&pair.key)?;
    let snapshot = Snapshot::new(path.clone(), state.store().get(&path).await?);
    Ok(Json(project_feed(snapshot.children())))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path((a, b)): Path<(String, String)>,
    Json(payload): Json<SendPayload>,
) -> Result<Response, ApiError> {
    let pair = Pair::parse(a, b)?;
    let sender = ParticipantId::new(payload.sender)?;
    let receiver = pair.counterpart(&sender)?;

    let publisher = MessagePublisher::new(state.store(), &pair.key)?;
    match publisher.send(&payload.body, &sender, receiver).await {
        Ok(SendOutcome::Skipped) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(SendOutcome::Sent { key }) => {
            Ok((StatusCode::CREATED, Json(SendResponse { key })).into_response())
        }
        Err(PublishError::Write(err)) => Err(err.into()),
        Err(PublishError::Encoding(err)) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string(),
        )),
    }
}

async fn set_typing(
    State(state): State<Arc<AppState>>,
    Path((a, b, id)): Path<(String, String, String)>,
    Json(payload): Json<TypingPayload>,
) -> Result<StatusCode, ApiError> {
    let pair = Pair::parse(a, b)?;
    let participant = ParticipantId::new(id)?;
    pair.counterpart(&participant)?;

    let path = typing_path(&pair.key, &participant)?;
    state
        .store()
        .set(&path, Value::Bool(payload.typing))
        .await?;
    debug!(%path, typing = payload.typing, "typing flag set");
    Ok(StatusCode::NO_CONTENT)
}

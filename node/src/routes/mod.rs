pub mod conversations;
pub mod health;
pub mod participants;

use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(participants::routes())
        .merge(conversations::routes())
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<duochat_messaging::IdError> for ApiError {
    fn from(value: duochat_messaging::IdError) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl From<duochat_messaging::ResolveError> for ApiError {
    fn from(value: duochat_messaging::ResolveError) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl From<crate::storage::StoreError> for ApiError {
    fn from(value: crate::storage::StoreError) -> Self {
        Self::unavailable(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

// error.rs

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Errors raised by the chat flow: message client, realtime feed,
/// conversation view and owner inbox.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The store rejected an insert, select or update
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A row or notification payload did not have the expected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// The realtime feed stopped delivering
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// A per-business fetch failed, the whole inbox recompute was abandoned
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Business not found: {0}")]
    BusinessNotFound(Uuid),

    #[error("A message is already being sent")]
    SendInFlight,

    #[error("Message text is empty")]
    EmptyMessage,
}

impl From<tokio_postgres::Error> for ChatError {
    fn from(e: tokio_postgres::Error) -> Self {
        // Server errors only display as "db error"; surface the server's message
        let reason = match e.as_db_error() {
            Some(db) => format!("{} ({})", db.message(), db.code().code()),
            None => e.to_string(),
        };
        ChatError::Persistence(reason)
    }
}

impl From<deadpool_postgres::PoolError> for ChatError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        ChatError::Persistence(format!("Error getting DB client: {}", e))
    }
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Persistence(_) | ChatError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChatError::Subscription(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Aggregation(_) => StatusCode::BAD_GATEWAY,
            ChatError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ChatError::BusinessNotFound(_) => StatusCode::NOT_FOUND,
            ChatError::SendInFlight => StatusCode::CONFLICT,
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

use axum::{
    extract::Path,
    response::{IntoResponse, Response},
    Extension, Json,
};
use hyper::StatusCode;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::ChatError,
    models::message::{Message, SendMessageRequest, SenderType},
    services::conversation_service::resolve_viewer_role,
    session::Session,
};

/// Role of the caller in the conversation; 404 if the business is unknown
async fn caller_role(
    state: &AppState,
    session: &Session,
    business_id: Uuid,
) -> Result<SenderType, ChatError> {
    let (_, role) = resolve_viewer_role(state.directory.as_ref(), session, business_id).await?;
    role.ok_or(ChatError::Unauthenticated)
}

pub async fn get_messages(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ChatError> {
    caller_role(&state, &session, business_id).await?;
    let messages = state.client(session).history(business_id).await?;
    Ok(Json(messages))
}

/// The sender type is derived from ownership, never taken from the body
pub async fn send_message(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
    }
    if payload.message.trim().is_empty() {
        return ChatError::EmptyMessage.into_response();
    }

    let role = match caller_role(&state, &session, business_id).await {
        Ok(role) => role,
        Err(e) => return e.into_response(),
    };

    match state
        .client(session)
        .send(business_id, &payload.message, role)
        .await
    {
        Ok(message) => {
            info!("Message {} sent to business {} as {}", message.id, business_id, role);
            (StatusCode::CREATED, Json(message)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn mark_read(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ChatError> {
    let role = caller_role(&state, &session, business_id).await?;
    let updated = state.client(session).mark_read(business_id, role).await?;
    Ok(Json(json!({ "updated": updated })))
}

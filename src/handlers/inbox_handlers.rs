use axum::{Extension, Json};

use crate::{
    app_state::AppState, error::ChatError, models::inbox::InboxResponse,
    services::inbox_service::OwnerInbox, session::Session,
};

/// Full recompute of the caller's inbox
pub async fn get_inbox(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<InboxResponse>, ChatError> {
    let inbox = OwnerInbox::new(
        state.client(session),
        state.directory.clone(),
        state.inbox_window,
    );
    inbox.refresh().await?;
    Ok(Json(inbox.snapshot()))
}

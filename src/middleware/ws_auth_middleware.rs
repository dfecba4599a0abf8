use axum::{
    extract::Query,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use super::bearer_token;
use crate::{app_state::AppState, services::jwt_service::validate_token, session::Session};

#[derive(Deserialize, Debug)]
pub struct WebSocketParams {
    /// Browsers cannot set headers on a websocket upgrade, so the token may
    /// travel in the query string instead
    pub token: Option<String>,
    /// Conversation to follow; absent means every business the caller owns
    pub business_id: Option<Uuid>,
}

pub async fn ws_auth_middleware<B>(
    Query(params): Query<WebSocketParams>,
    headers: HeaderMap,
    Extension(state): Extension<AppState>,
    mut request: Request<B>,
    next: Next<B>,
) -> Result<Response, StatusCode> {
    let token = match params.token.as_deref().or_else(|| bearer_token(&headers)) {
        Some(token) => token.to_string(),
        None => {
            error!("No token found in query params or Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    match validate_token(&token, &state.jwt_secret) {
        Some(user_id) => {
            info!("Websocket token verified for user: {}", user_id);
            request.extensions_mut().insert(Session::signed_in(user_id));
            Ok(next.run(request).await)
        }
        None => {
            error!("Websocket token verification failed");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

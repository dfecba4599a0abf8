use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::bearer_token;
use crate::{app_state::AppState, services::jwt_service::validate_token, session::Session};

/// Requires a valid bearer token and hands a signed-in [`Session`] to the
/// handlers through the request extensions.
pub async fn auth_middleware<B>(mut req: Request<B>, next: Next<B>) -> Result<Response, StatusCode> {
    let secret_key = match req.extensions().get::<AppState>() {
        Some(state) => state.jwt_secret.clone(),
        None => {
            error!("AppState extension missing from request");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let Some(token) = bearer_token(req.headers()) else {
        warn!("No bearer token on {}", req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    };

    match validate_token(token, &secret_key) {
        Some(user_id) => {
            debug!("Valid JWT token. User ID: {}", user_id);
            req.extensions_mut().insert(Session::signed_in(user_id));
            Ok(next.run(req).await)
        }
        None => {
            warn!("Rejected invalid JWT token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

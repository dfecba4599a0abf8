use std::collections::HashSet;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use tracing::{info, warn};

use super::{
    change_feed::{MessageFilter, Subscription},
    types::{ErrorMessage, WebSocketMessage},
};
use crate::{
    app_state::AppState, error::ChatError, middleware::ws_auth_middleware::WebSocketParams,
    services::conversation_service::resolve_viewer_role, session::Session,
};

// Upgrades to a websocket that streams inserts for one conversation, or
// for every business the caller owns when no business_id is given.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<WebSocketParams>,
) -> Result<Response, ChatError> {
    let user_id = session.user_id().ok_or(ChatError::Unauthenticated)?;

    let filter = match params.business_id {
        Some(business_id) => {
            resolve_viewer_role(state.directory.as_ref(), &session, business_id).await?;
            MessageFilter::Business(business_id)
        }
        None => {
            let owned: HashSet<_> = state
                .directory
                .businesses_owned_by(user_id)
                .await?
                .into_iter()
                .map(|business| business.id)
                .collect();
            MessageFilter::Businesses(owned)
        }
    };

    // Subscribe before the upgrade so nothing inserted meanwhile is missed
    let subscription = state.feed.subscribe_channel(filter);
    Ok(ws.on_upgrade(move |socket| stream_inserts(socket, subscription, session)))
}

// Forwards feed events until either side goes away. The subscription is
// released when this returns, whichever way it exits.
async fn stream_inserts(mut socket: WebSocket, mut subscription: Subscription, session: Session) {
    info!("Realtime stream opened for {:?}", session.user_id());

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            event = subscription.recv() => {
                let frame = match event {
                    Ok(message) => WebSocketMessage::Insert(message),
                    Err(e) => {
                        let frame = WebSocketMessage::Error(ErrorMessage {
                            code: "subscription".to_string(),
                            message: e.to_string(),
                        });
                        let _ = send_frame(&mut socket, &frame).await;
                        break;
                    }
                };
                if let Err(e) = send_frame(&mut socket, &frame).await {
                    warn!("Failed to push realtime message: {}", e);
                    break;
                }
            }
        }

        if !session.is_authenticated() {
            break;
        }
    }

    info!("Realtime stream closed for {:?}", session.user_id());
}

async fn send_frame(socket: &mut WebSocket, frame: &WebSocketMessage) -> Result<(), String> {
    let text = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    socket
        .send(WsMessage::Text(text))
        .await
        .map_err(|e| e.to_string())
}

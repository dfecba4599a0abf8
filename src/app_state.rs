// app_state.rs

use std::sync::Arc;

use crate::{
    repositories::{BusinessDirectory, MessageStore},
    services::chat_service::MessageClient,
    session::Session,
    websocket::change_feed::ChangeFeed,
};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Realtime insert fan-out
    pub feed: ChangeFeed,
    pub store: Arc<dyn MessageStore>,
    pub directory: Arc<dyn BusinessDirectory>,
    /// HS256 secret the bearer tokens are signed with
    pub jwt_secret: Arc<str>,
    /// Recent messages per business considered by the inbox
    pub inbox_window: usize,
}

impl AppState {
    pub fn new(
        feed: ChangeFeed,
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn BusinessDirectory>,
        jwt_secret: &str,
        inbox_window: usize,
    ) -> Self {
        Self {
            feed,
            store,
            directory,
            jwt_secret: Arc::from(jwt_secret),
            inbox_window,
        }
    }

    /// A message client acting for the given session
    pub fn client(&self, session: Session) -> MessageClient {
        MessageClient::new(self.store.clone(), session)
    }
}

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    error::ChatError,
    models::message::{Message, NewMessage, SenderType},
    repositories::MessageStore,
    session::Session,
};

/// Send, history and mark-read against the message store, on behalf of
/// one session.
#[derive(Clone)]
pub struct MessageClient {
    store: Arc<dyn MessageStore>,
    session: Session,
}

impl MessageClient {
    pub fn new(store: Arc<dyn MessageStore>, session: Session) -> Self {
        Self { store, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Inserts an unread message. Anonymous sessions send with no sender id.
    pub async fn send(
        &self,
        business_id: Uuid,
        text: &str,
        sender_type: SenderType,
    ) -> Result<Message, ChatError> {
        let new_message = NewMessage {
            business_id,
            sender_id: self.session.user_id(),
            sender_type,
            message: text.to_string(),
        };

        self.store.insert_message(new_message).await.map_err(|e| {
            error!("Error sending message to business {}: {}", business_id, e);
            e
        })
    }

    /// The whole conversation, oldest first
    pub async fn history(&self, business_id: Uuid) -> Result<Vec<Message>, ChatError> {
        self.store.messages_for_business(business_id).await
    }

    /// The newest `limit` messages, newest first
    pub async fn recent(&self, business_id: Uuid, limit: usize) -> Result<Vec<Message>, ChatError> {
        self.store.recent_messages(business_id, limit).await
    }

    /// Marks read everything in the conversation not authored by `viewer_role`
    pub async fn mark_read(
        &self,
        business_id: Uuid,
        viewer_role: SenderType,
    ) -> Result<u64, ChatError> {
        let touched = self.store.mark_read(business_id, viewer_role).await?;
        debug!(
            "Marked {} messages read in business {} for {}",
            touched, business_id, viewer_role
        );
        Ok(touched)
    }
}

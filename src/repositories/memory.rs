// repositories/memory.rs

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{BusinessDirectory, MessageStore};
use crate::{
    error::ChatError,
    models::{
        business::Business,
        message::{Message, NewMessage, SenderType},
    },
    websocket::change_feed::ChangeFeed,
};

/// Both tables held in process memory, for unit tests.
///
/// Publishes every insert on the attached feed, standing in for the
/// database trigger and listener. `set_unavailable` injects store failures.
#[derive(Default)]
pub struct InMemoryStore {
    messages: Mutex<Vec<Message>>,
    businesses: Mutex<HashMap<Uuid, Business>>,
    feed: Option<ChangeFeed>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            feed: Some(feed),
            ..Self::default()
        }
    }

    pub fn add_business(&self, business: Business) -> Result<(), ChatError> {
        self.businesses
            .lock()
            .map_err(|_| lock_error())?
            .insert(business.id, business);
        Ok(())
    }

    /// Makes every following call fail with a persistence error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    fn check_available(&self) -> Result<(), ChatError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(ChatError::Persistence("store unavailable".to_string()));
        }
        Ok(())
    }
}

fn lock_error() -> ChatError {
    ChatError::Persistence("Lock error".to_string())
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, ChatError> {
        self.check_available()?;

        let message = {
            let mut messages = self.messages.lock().map_err(|_| lock_error())?;

            // Keep created_at strictly increasing so ordering is total
            let mut created_at = Utc::now();
            if let Some(last) = messages.iter().map(|m| m.created_at).max() {
                if created_at <= last {
                    created_at = last + Duration::microseconds(1);
                }
            }

            let message = Message {
                id: Uuid::new_v4(),
                business_id: new_message.business_id,
                sender_id: new_message.sender_id,
                sender_type: new_message.sender_type,
                message: new_message.message,
                read: false,
                created_at,
            };
            messages.push(message.clone());
            message
        };

        if let Some(feed) = &self.feed {
            feed.publish(message.clone());
        }

        Ok(message)
    }

    async fn find_message(&self, message_id: Uuid) -> Result<Option<Message>, ChatError> {
        self.check_available()?;

        let messages = self.messages.lock().map_err(|_| lock_error())?;
        Ok(messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn messages_for_business(&self, business_id: Uuid) -> Result<Vec<Message>, ChatError> {
        self.check_available()?;

        let messages = self.messages.lock().map_err(|_| lock_error())?;
        let mut conversation: Vec<Message> = messages
            .iter()
            .filter(|m| m.business_id == business_id)
            .cloned()
            .collect();
        conversation.sort_by_key(|m| m.created_at);
        Ok(conversation)
    }

    async fn recent_messages(
        &self,
        business_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        let mut conversation = self.messages_for_business(business_id).await?;
        conversation.reverse();
        conversation.truncate(limit);
        Ok(conversation)
    }

    async fn mark_read(&self, business_id: Uuid, reader: SenderType) -> Result<u64, ChatError> {
        self.check_available()?;

        let mut messages = self.messages.lock().map_err(|_| lock_error())?;
        let mut touched = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.business_id == business_id && m.sender_type != reader)
        {
            message.read = true;
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl BusinessDirectory for InMemoryStore {
    async fn find_business(&self, business_id: Uuid) -> Result<Option<Business>, ChatError> {
        self.check_available()?;

        let businesses = self.businesses.lock().map_err(|_| lock_error())?;
        Ok(businesses.get(&business_id).cloned())
    }

    async fn businesses_owned_by(&self, owner_id: Uuid) -> Result<Vec<Business>, ChatError> {
        self.check_available()?;

        let businesses = self.businesses.lock().map_err(|_| lock_error())?;
        let mut owned: Vec<Business> = businesses
            .values()
            .filter(|b| b.is_owned_by(owner_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(owned)
    }
}

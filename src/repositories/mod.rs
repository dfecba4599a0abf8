// src/repositories/mod.rs

pub mod business_repository;
pub mod chat_repository;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::ChatError,
    models::{
        business::Business,
        message::{Message, NewMessage, SenderType},
    },
};

/// The `business_messages` table
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Inserts one unread message and returns the persisted row
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, ChatError>;

    async fn find_message(&self, message_id: Uuid) -> Result<Option<Message>, ChatError>;

    /// Every message of one business, oldest first
    async fn messages_for_business(&self, business_id: Uuid) -> Result<Vec<Message>, ChatError>;

    /// The newest `limit` messages of one business, newest first
    async fn recent_messages(
        &self,
        business_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError>;

    /// Flags as read every message of `business_id` not sent by `reader`.
    /// Returns the number of rows touched.
    async fn mark_read(&self, business_id: Uuid, reader: SenderType) -> Result<u64, ChatError>;
}

/// Read-only view of the `businesses` table
#[async_trait]
pub trait BusinessDirectory: Send + Sync {
    async fn find_business(&self, business_id: Uuid) -> Result<Option<Business>, ChatError>;

    async fn businesses_owned_by(&self, owner_id: Uuid) -> Result<Vec<Business>, ChatError>;
}

// repositories/chat_repository.rs

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use uuid::Uuid;

use super::MessageStore;
use crate::{
    error::ChatError,
    models::message::{Message, NewMessage, SenderType},
};

/// `business_messages` backed by Postgres.
///
/// Inserts are not published here; the insert trigger notifies the
/// store listener, which feeds the realtime subscribers.
pub struct PostgresMessageStore {
    pool: Arc<Pool>,
}

impl PostgresMessageStore {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, ChatError> {
        let client = self.pool.get().await?;
        let query = format!(
            "INSERT INTO business_messages (id, business_id, sender_id, sender_type, message, read)
             VALUES ($1, $2, $3, $4, $5, FALSE)
             RETURNING {}",
            Message::COLUMNS
        );

        let row = client
            .query_one(
                query.as_str(),
                &[
                    &Uuid::new_v4(),
                    &new_message.business_id,
                    &new_message.sender_id,
                    &new_message.sender_type.as_str(),
                    &new_message.message,
                ],
            )
            .await?;

        Message::from_row(&row)
    }

    async fn find_message(&self, message_id: Uuid) -> Result<Option<Message>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM business_messages WHERE id = $1",
            Message::COLUMNS
        );

        let row = client.query_opt(query.as_str(), &[&message_id]).await?;
        row.as_ref().map(Message::from_row).transpose()
    }

    async fn messages_for_business(&self, business_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM business_messages
             WHERE business_id = $1
             ORDER BY created_at ASC",
            Message::COLUMNS
        );

        let rows = client.query(query.as_str(), &[&business_id]).await?;
        rows.iter().map(Message::from_row).collect()
    }

    async fn recent_messages(
        &self,
        business_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM business_messages
             WHERE business_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
            Message::COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = client.query(query.as_str(), &[&business_id, &limit]).await?;
        rows.iter().map(Message::from_row).collect()
    }

    async fn mark_read(&self, business_id: Uuid, reader: SenderType) -> Result<u64, ChatError> {
        let client = self.pool.get().await?;
        let query = "
            UPDATE business_messages
            SET read = TRUE
            WHERE business_id = $1 AND sender_type <> $2
        ";

        Ok(client
            .execute(query, &[&business_id, &reader.as_str()])
            .await?)
    }
}

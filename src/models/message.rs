use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;
use validator::Validate;

use crate::error::ChatError;

/// Which side of a conversation authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Customer,
    Business,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Customer => "customer",
            SenderType::Business => "business",
        }
    }

    /// The role on the other side of the conversation
    pub fn counterpart(&self) -> SenderType {
        match self {
            SenderType::Customer => SenderType::Business,
            SenderType::Business => SenderType::Customer,
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(SenderType::Customer),
            "business" => Ok(SenderType::Business),
            other => Err(ChatError::Schema(format!("unknown sender_type '{}'", other))),
        }
    }
}

/// A row of `business_messages`. Only `read` ever changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub business_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub sender_type: SenderType,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Column list shared by every select against `business_messages`
    pub const COLUMNS: &'static str =
        "id, business_id, sender_id, sender_type, message, read, created_at";

    /// Builds a message from a row selected with [`Message::COLUMNS`]
    pub fn from_row(row: &Row) -> Result<Self, ChatError> {
        let sender_type: String = row
            .try_get("sender_type")
            .map_err(|e| ChatError::Schema(e.to_string()))?;

        Ok(Message {
            id: get_column(row, "id")?,
            business_id: get_column(row, "business_id")?,
            sender_id: get_column(row, "sender_id")?,
            sender_type: sender_type.parse()?,
            message: get_column(row, "message")?,
            read: get_column(row, "read")?,
            created_at: get_column(row, "created_at")?,
        })
    }
}

fn get_column<'a, T>(row: &'a Row, column: &str) -> Result<T, ChatError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| ChatError::Schema(format!("column '{}': {}", column, e)))
}

/// What a caller supplies to insert a message; the store fills in the rest
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub business_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub sender_type: SenderType,
    pub message: String,
}

#[derive(Deserialize, Validate, Debug)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "The message must be between 1 and 2000 characters long"))]
    pub message: String,
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Per-business conversation summary shown in an owner's inbox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboxItem {
    pub business_id: Uuid,
    pub business_name: String,
    pub city: Option<String>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub items: Vec<InboxItem>,
    pub total_unread: usize,
    pub badge: Option<String>,
}

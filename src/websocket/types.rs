use serde::{Deserialize, Serialize};

use crate::models::message::Message;

/// Frames pushed to websocket clients
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WebSocketMessage {
    /// A row was inserted into a followed conversation
    Insert(Message),
    Error(ErrorMessage),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::ChatError;

/// The slice of a directory entry the chat flow reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub owner_id: Option<Uuid>,
}

impl Business {
    pub const COLUMNS: &'static str = "id, name, city, owner_id";

    pub fn from_row(row: &Row) -> Result<Self, ChatError> {
        let schema = |e: tokio_postgres::Error| ChatError::Schema(e.to_string());

        Ok(Business {
            id: row.try_get("id").map_err(schema)?,
            name: row.try_get("name").map_err(schema)?,
            city: row.try_get("city").map_err(schema)?,
            owner_id: row.try_get("owner_id").map_err(schema)?,
        })
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }
}

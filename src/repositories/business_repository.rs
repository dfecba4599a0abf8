// repositories/business_repository.rs

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use uuid::Uuid;

use super::BusinessDirectory;
use crate::{error::ChatError, models::business::Business};

pub struct PostgresBusinessDirectory {
    pool: Arc<Pool>,
}

impl PostgresBusinessDirectory {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusinessDirectory for PostgresBusinessDirectory {
    async fn find_business(&self, business_id: Uuid) -> Result<Option<Business>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {} FROM businesses WHERE id = $1", Business::COLUMNS);

        let row = client.query_opt(query.as_str(), &[&business_id]).await?;
        row.as_ref().map(Business::from_row).transpose()
    }

    async fn businesses_owned_by(&self, owner_id: Uuid) -> Result<Vec<Business>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM businesses WHERE owner_id = $1 ORDER BY name",
            Business::COLUMNS
        );

        let rows = client.query(query.as_str(), &[&owner_id]).await?;
        rows.iter().map(Business::from_row).collect()
    }
}

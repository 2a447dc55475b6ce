//! Item repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use filedrop_core::error::{AppError, ErrorKind};
use filedrop_core::result::AppResult;
use filedrop_core::types::ItemId;
use filedrop_entity::ItemRecord;

use super::ItemRepository;

/// PostgreSQL repository for the `items` table.
#[derive(Debug, Clone)]
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    /// Create a new item repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn list_items(&self) -> AppResult<Vec<ItemRecord>> {
        sqlx::query_as::<_, ItemRecord>(
            "SELECT id, title, description, owner_id FROM items ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list items", e))
    }

    async fn delete_item(&self, id: ItemId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete item", e))?;
        Ok(result.rows_affected() > 0)
    }
}

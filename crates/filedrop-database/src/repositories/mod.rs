//! Persistence gateway traits and their implementations.
//!
//! The maintenance jobs only ever see the three traits below. Every `list_*`
//! method returns rows in a stable retrieval order that callers may rely on:
//! files by creation time then id, users and items by primary key ascending.

pub mod file;
pub mod item;
pub mod memory;
pub mod user;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use filedrop_core::config::{DatabaseBackend, DatabaseConfig};
use filedrop_core::result::AppResult;
use filedrop_core::types::{FileId, ItemId, UserId};
use filedrop_entity::{FileRecord, ItemRecord, UserRecord};

use crate::connection::connect_pool;
use crate::migration::run_migrations;

pub use file::PgFileRepository;
pub use item::PgItemRepository;
pub use memory::MemoryRepository;
pub use user::PgUserRepository;

/// Storage of uploaded-file metadata.
#[async_trait]
pub trait FileRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a record for a file already written to storage.
    async fn create_file(&self, filename: &str, path: &str) -> AppResult<FileRecord>;

    /// List every file record, oldest first.
    async fn list_files(&self) -> AppResult<Vec<FileRecord>>;

    /// Find a file record by id.
    async fn get_file(&self, id: FileId) -> AppResult<Option<FileRecord>>;

    /// Delete a file record. Returns `true` if a row was removed.
    async fn delete_file(&self, id: FileId) -> AppResult<bool>;
}

/// Storage of user rows.
#[async_trait]
pub trait UserRepository: Send + Sync + std::fmt::Debug + 'static {
    /// List every user, primary key ascending.
    async fn list_users(&self) -> AppResult<Vec<UserRecord>>;

    /// Delete a user. Returns `true` if a row was removed.
    async fn delete_user(&self, id: UserId) -> AppResult<bool>;
}

/// Storage of item rows.
#[async_trait]
pub trait ItemRepository: Send + Sync + std::fmt::Debug + 'static {
    /// List every item, primary key ascending.
    async fn list_items(&self) -> AppResult<Vec<ItemRecord>>;

    /// Delete an item. Returns `true` if a row was removed.
    async fn delete_item(&self, id: ItemId) -> AppResult<bool>;
}

/// The three repositories wired to one backend.
#[derive(Debug, Clone)]
pub struct RepositorySet {
    /// File metadata repository.
    pub files: Arc<dyn FileRepository>,
    /// User repository.
    pub users: Arc<dyn UserRepository>,
    /// Item repository.
    pub items: Arc<dyn ItemRepository>,
}

impl RepositorySet {
    /// Build the repositories for the configured backend.
    ///
    /// For PostgreSQL this connects the pool and, when enabled, applies
    /// pending migrations first.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            DatabaseBackend::Postgres => {
                let pool = connect_pool(config).await?;
                if config.run_migrations {
                    run_migrations(&pool).await?;
                }
                Ok(Self::postgres(pool))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory repositories; records are lost on restart");
                Ok(Self::memory(Arc::new(MemoryRepository::new())))
            }
        }
    }

    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            files: Arc::new(PgFileRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            items: Arc::new(PgItemRepository::new(pool)),
        }
    }

    /// All three repositories served by one in-memory store.
    pub fn memory(store: Arc<MemoryRepository>) -> Self {
        Self {
            files: store.clone(),
            users: store.clone(),
            items: store,
        }
    }
}

//! In-memory repository used by the `memory` backend and by tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use filedrop_core::result::AppResult;
use filedrop_core::types::{FileId, ItemId, UserId};
use filedrop_entity::{FileRecord, ItemRecord, UserRecord};

use super::{FileRepository, ItemRepository, UserRepository};

#[derive(Debug, Default)]
struct Tables {
    /// Files in insertion order.
    files: Vec<FileRecord>,
    users: BTreeMap<UserId, UserRecord>,
    items: BTreeMap<ItemId, ItemRecord>,
    next_user_id: i64,
    next_item_id: i64,
}

/// Process-local implementation of every repository trait.
///
/// Retrieval order matches the PostgreSQL repositories: files in insertion
/// order, users and items by ascending id.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with the next serial id.
    pub async fn insert_user(&self, email: &str) -> UserRecord {
        let mut tables = self.tables.write().await;
        tables.next_user_id += 1;
        let user = UserRecord {
            id: UserId(tables.next_user_id),
            email: email.to_string(),
            is_active: true,
        };
        tables.users.insert(user.id, user.clone());
        user
    }

    /// Insert an item with the next serial id.
    pub async fn insert_item(&self, title: &str, owner_id: Option<UserId>) -> ItemRecord {
        let mut tables = self.tables.write().await;
        tables.next_item_id += 1;
        let item = ItemRecord {
            id: ItemId(tables.next_item_id),
            title: title.to_string(),
            description: None,
            owner_id,
        };
        tables.items.insert(item.id, item.clone());
        item
    }

    /// Number of file records currently stored.
    pub async fn file_count(&self) -> usize {
        self.tables.read().await.files.len()
    }
}

#[async_trait]
impl FileRepository for MemoryRepository {
    async fn create_file(&self, filename: &str, path: &str) -> AppResult<FileRecord> {
        let record = FileRecord {
            id: FileId::new(),
            filename: filename.to_string(),
            path: path.to_string(),
        };
        self.tables.write().await.files.push(record.clone());
        Ok(record)
    }

    async fn list_files(&self) -> AppResult<Vec<FileRecord>> {
        Ok(self.tables.read().await.files.clone())
    }

    async fn get_file(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.files.iter().find(|f| f.id == id).cloned())
    }

    async fn delete_file(&self, id: FileId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.files.len();
        tables.files.retain(|f| f.id != id);
        Ok(tables.files.len() < before)
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn list_users(&self) -> AppResult<Vec<UserRecord>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn delete_user(&self, id: UserId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(&id).is_some();
        if removed {
            for item in tables.items.values_mut() {
                if item.owner_id == Some(id) {
                    item.owner_id = None;
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ItemRepository for MemoryRepository {
    async fn list_items(&self) -> AppResult<Vec<ItemRecord>> {
        Ok(self.tables.read().await.items.values().cloned().collect())
    }

    async fn delete_item(&self, id: ItemId) -> AppResult<bool> {
        Ok(self.tables.write().await.items.remove(&id).is_some())
    }
}

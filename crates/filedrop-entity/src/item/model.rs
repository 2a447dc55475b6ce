//! Item entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use filedrop_core::types::{ItemId, UserId};

/// An item row owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ItemRecord {
    /// Serial primary key; list order follows it.
    pub id: ItemId,
    /// Item title.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Owning user, if any.
    pub owner_id: Option<UserId>,
}

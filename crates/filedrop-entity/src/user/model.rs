//! User entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use filedrop_core::types::UserId;

/// A user row. Only the columns the maintenance jobs need are mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    /// Serial primary key; list order follows it.
    pub id: UserId,
    /// Login email address.
    pub email: String,
    /// Whether the account is active.
    pub is_active: bool,
}

//! File entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use filedrop_core::types::FileId;

/// Metadata for an uploaded file persisted by the upload drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: FileId,
    /// The name the client uploaded the file under.
    pub filename: String,
    /// Storage path, `"{upload_dir}/{YYYYMMDD-HHMMSS}_{name}"`.
    pub path: String,
}

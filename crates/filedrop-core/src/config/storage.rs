//! Storage provider configuration.

use serde::{Deserialize, Serialize};

/// Local file storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local storage provider.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Directory, relative to the root, that drained uploads are written to.
    ///
    /// Stored paths are `"{upload_dir}/{YYYYMMDD-HHMMSS}_{name}"`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_root_path() -> String {
    "./data".to_string()
}

fn default_upload_dir() -> String {
    "files".to_string()
}

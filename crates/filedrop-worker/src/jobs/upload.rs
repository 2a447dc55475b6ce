//! Persists queued uploads to storage and records them in the database.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use filedrop_core::error::AppError;
use filedrop_core::result::AppResult;
use filedrop_core::traits::storage::StorageProvider;
use filedrop_database::repositories::FileRepository;
use filedrop_entity::FileRecord;

use crate::naming::{sanitize_filename, storage_path, with_counter};
use crate::queue::{PendingUpload, UploadQueue};
use crate::task::{JobExecutionError, ScheduledAction};

/// Suffixes tried before giving up on finding a free name.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Uploads taken from the queue.
    pub drained: usize,
    /// Uploads written and recorded.
    pub stored: usize,
    /// Uploads dropped after a storage or database failure.
    pub failed: usize,
}

/// Moves every queued upload to storage and creates its file record.
///
/// A failed upload is logged and dropped; it never blocks the rest of the
/// batch and is not put back on the queue.
#[derive(Debug)]
pub struct UploadDrainJob {
    queue: Arc<UploadQueue>,
    storage: Arc<dyn StorageProvider>,
    files: Arc<dyn FileRepository>,
    upload_dir: String,
}

impl UploadDrainJob {
    /// Create a drain job writing under `upload_dir` in `storage`.
    pub fn new(
        queue: Arc<UploadQueue>,
        storage: Arc<dyn StorageProvider>,
        files: Arc<dyn FileRepository>,
        upload_dir: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            storage,
            files,
            upload_dir: upload_dir.into(),
        }
    }

    /// Drain the queue once.
    pub async fn drain(&self) -> DrainReport {
        let batch = self.queue.drain();
        let mut report = DrainReport {
            drained: batch.len(),
            ..DrainReport::default()
        };

        if batch.is_empty() {
            tracing::debug!("Upload queue empty, nothing to drain");
            return report;
        }

        tracing::info!("Draining {} queued upload(s)", batch.len());

        let mut claimed = HashSet::with_capacity(batch.len());
        for upload in &batch {
            match self.persist(upload, &mut claimed).await {
                Ok(record) => {
                    report.stored += 1;
                    tracing::info!(
                        file_id = %record.id,
                        path = %record.path,
                        queued_ms = (Utc::now() - upload.received_at).num_milliseconds(),
                        "Stored upload '{}'",
                        record.filename
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        filename = %upload.filename,
                        declared_size = upload.declared_size,
                        "Dropping upload: {}",
                        e
                    );
                }
            }
        }

        report
    }

    async fn persist(
        &self,
        upload: &PendingUpload,
        claimed: &mut HashSet<String>,
    ) -> AppResult<FileRecord> {
        let name = sanitize_filename(&upload.filename);
        let path = self.free_path(&name, claimed).await?;

        self.storage.write(&path, upload.payload.clone()).await?;

        match self.files.create_file(&upload.filename, &path).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&path).await {
                    tracing::warn!("Failed to remove orphaned file '{}': {}", path, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Find a path not used by this pass nor already present in storage.
    async fn free_path(&self, name: &str, claimed: &mut HashSet<String>) -> AppResult<String> {
        let now = Utc::now();
        for n in 0..MAX_NAME_ATTEMPTS {
            let candidate = if n == 0 {
                storage_path(&self.upload_dir, now, name)
            } else {
                storage_path(&self.upload_dir, now, &with_counter(name, n))
            };
            if claimed.contains(&candidate) || self.storage.exists(&candidate).await? {
                continue;
            }
            claimed.insert(candidate.clone());
            return Ok(candidate);
        }
        Err(AppError::storage(format!(
            "No free storage name for '{name}' after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }
}

#[async_trait]
impl ScheduledAction for UploadDrainJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        let report = self.drain().await;
        Ok(Some(serde_json::to_value(report).map_err(AppError::from)?))
    }
}

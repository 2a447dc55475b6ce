//! Deletes stored files older than the retention threshold.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use filedrop_core::error::AppError;
use filedrop_core::traits::storage::StorageProvider;
use filedrop_database::repositories::FileRepository;
use filedrop_entity::FileRecord;

use crate::naming::parse_timestamp;
use crate::task::{JobExecutionError, ScheduledAction};

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    /// File records examined.
    pub scanned: usize,
    /// Records older than the threshold.
    pub expired: usize,
    /// Expired records whose bytes and row were both removed.
    pub deleted: usize,
    /// Records skipped because no timestamp could be read from the path.
    pub malformed: usize,
    /// Expired records kept because a delete failed.
    pub failed: usize,
}

/// Removes files whose storage timestamp is older than `threshold`.
///
/// Age is read from the timestamp prefix of the stored path. The file
/// bytes go first; if that fails the record is kept so the next sweep
/// retries. A file already missing from storage counts as removed.
#[derive(Debug)]
pub struct RetentionSweepJob {
    storage: Arc<dyn StorageProvider>,
    files: Arc<dyn FileRepository>,
    threshold: Duration,
}

impl RetentionSweepJob {
    /// Create a sweep that removes files older than `threshold`.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        files: Arc<dyn FileRepository>,
        threshold: Duration,
    ) -> Self {
        Self {
            storage,
            files,
            threshold,
        }
    }

    /// Sweep against the current time.
    pub async fn sweep(&self) -> Result<RetentionReport, JobExecutionError> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the current time were `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<RetentionReport, JobExecutionError> {
        let records = self
            .files
            .list_files()
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Failed to list files: {}", e)))?;

        let mut report = RetentionReport {
            scanned: records.len(),
            ..RetentionReport::default()
        };

        for record in &records {
            let stored_at = match parse_timestamp(&record.path) {
                Ok(ts) => ts,
                Err(e) => {
                    report.malformed += 1;
                    tracing::warn!(file_id = %record.id, "Skipping file record: {}", e);
                    continue;
                }
            };

            if now - stored_at <= self.threshold {
                continue;
            }
            report.expired += 1;

            match self.remove(record).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        file_id = %record.id,
                        path = %record.path,
                        "Failed to expire file, will retry next sweep: {}",
                        e
                    );
                }
            }
        }

        if report.deleted > 0 {
            tracing::info!("Expired {} stored file(s)", report.deleted);
        }
        Ok(report)
    }

    async fn remove(&self, record: &FileRecord) -> Result<(), AppError> {
        match self.storage.delete(&record.path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("File bytes for '{}' already gone", record.path);
            }
            Err(e) => return Err(e),
        }

        if !self.files.delete_file(record.id).await? {
            tracing::debug!("File record {} was already removed", record.id);
        }
        tracing::info!(file_id = %record.id, "Deleted expired file '{}'", record.path);
        Ok(())
    }
}

#[async_trait]
impl ScheduledAction for RetentionSweepJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        let report = self.sweep().await?;
        Ok(Some(serde_json::to_value(report).map_err(AppError::from)?))
    }
}

//! Process-wide owner of the upload queue and the maintenance scheduler.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use filedrop_core::config::{MaintenanceConfig, TaskScheduleConfig};
use filedrop_core::result::AppResult;
use filedrop_core::traits::storage::StorageProvider;
use filedrop_database::repositories::RepositorySet;

use crate::jobs::{
    RETENTION_SWEEP, ROW_CAP_SWEEP, RetentionSweepJob, RowCapSweepJob, UPLOAD_DRAIN,
    UploadDrainJob,
};
use crate::queue::{PendingUpload, UploadQueue};
use crate::scheduler::{PeriodicScheduler, SchedulerState};
use crate::task::ScheduledAction;

/// Wires the maintenance jobs to one queue and one scheduler.
///
/// Construct it once at startup, call [`on_startup`](Self::on_startup)
/// when the host begins serving and [`on_shutdown`](Self::on_shutdown)
/// when it stops. Upload handlers call
/// [`enqueue_upload`](Self::enqueue_upload) and never wait on storage.
#[derive(Debug)]
pub struct MaintenanceService {
    queue: Arc<UploadQueue>,
    scheduler: PeriodicScheduler,
}

impl MaintenanceService {
    /// Build the jobs and register every enabled one with a new scheduler.
    pub fn new(
        config: &MaintenanceConfig,
        upload_dir: &str,
        storage: Arc<dyn StorageProvider>,
        repositories: &RepositorySet,
    ) -> AppResult<Self> {
        config.validate()?;

        let queue = Arc::new(UploadQueue::new());
        let scheduler = PeriodicScheduler::new(config.shutdown_grace());

        let drain = UploadDrainJob::new(
            Arc::clone(&queue),
            Arc::clone(&storage),
            Arc::clone(&repositories.files),
            upload_dir,
        );
        let retention = RetentionSweepJob::new(
            storage,
            Arc::clone(&repositories.files),
            config.retention()?,
        );
        let row_cap = RowCapSweepJob::new(
            Arc::clone(&repositories.users),
            Arc::clone(&repositories.items),
            config.max_users,
            config.max_items,
        );

        let jobs: [(&str, Arc<dyn ScheduledAction>, &TaskScheduleConfig); 3] = [
            (UPLOAD_DRAIN, Arc::new(drain), &config.upload_drain),
            (RETENTION_SWEEP, Arc::new(retention), &config.retention_sweep),
            (ROW_CAP_SWEEP, Arc::new(row_cap), &config.row_cap_sweep),
        ];
        for (name, action, schedule) in jobs {
            if !schedule.enabled {
                tracing::info!("Scheduled task '{}' is disabled", name);
                continue;
            }
            scheduler.register(name, action, schedule.period(), schedule.start_delay())?;
        }

        Ok(Self { queue, scheduler })
    }

    /// Hand an upload to the background drain. Returns immediately.
    pub fn enqueue_upload(
        &self,
        filename: impl Into<String>,
        content_type: Option<String>,
        declared_size: u64,
        payload: Bytes,
    ) {
        self.queue.enqueue(PendingUpload::new(
            filename,
            content_type,
            declared_size,
            payload,
        ));
    }

    /// Start the scheduler.
    pub async fn on_startup(&self) -> AppResult<()> {
        self.scheduler.start().await
    }

    /// Stop the scheduler and wait for in-flight jobs.
    ///
    /// Uploads still queued at this point are lost.
    pub async fn on_shutdown(&self) -> AppResult<()> {
        self.scheduler.stop().await?;
        let pending = self.queue.len();
        if pending > 0 {
            tracing::warn!("Discarding {} queued upload(s) at shutdown", pending);
        }
        Ok(())
    }

    /// Run one registered task immediately and return its summary.
    pub async fn run_task(&self, name: &str) -> AppResult<Option<Value>> {
        self.scheduler.trigger(name).await
    }

    /// The upload queue.
    pub fn queue(&self) -> &Arc<UploadQueue> {
        &self.queue
    }

    /// Names of the registered tasks.
    pub fn task_names(&self) -> Vec<String> {
        self.scheduler.task_names()
    }

    /// Scheduler lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }
}

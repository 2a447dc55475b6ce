//! Background maintenance for FileDrop.
//!
//! This crate provides:
//! - An in-memory upload queue that decouples request handlers from storage
//! - A periodic scheduler running named tasks on independent intervals
//! - The upload drain, file retention, and row-cap maintenance jobs
//! - [`MaintenanceService`], which owns all of the above for one process

pub mod jobs;
pub mod naming;
pub mod queue;
pub mod scheduler;
pub mod service;
pub mod task;

pub use queue::{PendingUpload, UploadQueue};
pub use scheduler::{PeriodicScheduler, SchedulerState};
pub use service::MaintenanceService;
pub use task::{JobExecutionError, ScheduledAction};

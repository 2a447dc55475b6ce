//! Maintenance jobs run by the scheduler.

pub mod retention;
pub mod row_cap;
pub mod upload;

pub use retention::{RetentionReport, RetentionSweepJob};
pub use row_cap::{CapReport, RowCapReport, RowCapSweepJob};
pub use upload::{DrainReport, UploadDrainJob};

/// Scheduler name of the upload drain task.
pub const UPLOAD_DRAIN: &str = "upload_drain";

/// Scheduler name of the file retention task.
pub const RETENTION_SWEEP: &str = "retention_sweep";

/// Scheduler name of the user and item row-cap task.
pub const ROW_CAP_SWEEP: &str = "row_cap_sweep";

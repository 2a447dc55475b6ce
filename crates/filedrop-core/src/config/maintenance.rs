//! Background maintenance configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upper bound on `retention_minutes`: ten years.
pub const MAX_RETENTION_MINUTES: u64 = 10 * 366 * 24 * 60;

/// Timing of one periodic maintenance task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskScheduleConfig {
    /// Whether the task is registered with the scheduler at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between two invocations.
    pub interval_seconds: u64,
    /// Seconds to wait after startup before the first invocation.
    #[serde(default)]
    pub start_delay_seconds: u64,
}

impl TaskScheduleConfig {
    /// A schedule firing every `interval_seconds`, first after one interval.
    pub const fn every(interval_seconds: u64) -> Self {
        Self {
            enabled: true,
            interval_seconds,
            start_delay_seconds: interval_seconds,
        }
    }

    /// Interval as a [`Duration`].
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Start delay as a [`Duration`].
    pub fn start_delay(&self) -> Duration {
        Duration::from_secs(self.start_delay_seconds)
    }
}

/// Upload drain, file retention and row-cap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Queue drain schedule.
    #[serde(default = "default_upload_drain")]
    pub upload_drain: TaskScheduleConfig,
    /// File retention sweep schedule.
    #[serde(default = "default_retention_sweep")]
    pub retention_sweep: TaskScheduleConfig,
    /// User and item row-cap sweep schedule.
    #[serde(default = "default_row_cap_sweep")]
    pub row_cap_sweep: TaskScheduleConfig,
    /// Maximum age of a stored file, in minutes.
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u64,
    /// Number of user rows kept by the row-cap sweep.
    #[serde(default = "default_max_rows")]
    pub max_users: usize,
    /// Number of item rows kept by the row-cap sweep.
    #[serde(default = "default_max_rows")]
    pub max_items: usize,
    /// Seconds `stop()` waits for in-flight invocations to finish.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl MaintenanceConfig {
    /// Retention threshold as a [`chrono::Duration`].
    pub fn retention(&self) -> Result<chrono::Duration, AppError> {
        i64::try_from(self.retention_minutes)
            .ok()
            .filter(|m| (1..=MAX_RETENTION_MINUTES as i64).contains(m))
            .and_then(chrono::Duration::try_minutes)
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "maintenance.retention_minutes must be between 1 and {MAX_RETENTION_MINUTES}, got {}",
                    self.retention_minutes
                ))
            })
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// Reject schedules that would spin.
    pub fn validate(&self) -> Result<(), AppError> {
        let schedules = [
            ("upload_drain", &self.upload_drain),
            ("retention_sweep", &self.retention_sweep),
            ("row_cap_sweep", &self.row_cap_sweep),
        ];
        self.retention()?;

        for (name, schedule) in schedules {
            if schedule.enabled && schedule.interval_seconds == 0 {
                return Err(AppError::configuration(format!(
                    "maintenance.{name}.interval_seconds must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            upload_drain: default_upload_drain(),
            retention_sweep: default_retention_sweep(),
            row_cap_sweep: default_row_cap_sweep(),
            retention_minutes: default_retention_minutes(),
            max_users: default_max_rows(),
            max_items: default_max_rows(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_upload_drain() -> TaskScheduleConfig {
    TaskScheduleConfig::every(240)
}

fn default_retention_sweep() -> TaskScheduleConfig {
    TaskScheduleConfig::every(300)
}

fn default_row_cap_sweep() -> TaskScheduleConfig {
    TaskScheduleConfig::every(600)
}

fn default_retention_minutes() -> u64 {
    30
}

fn default_max_rows() -> usize {
    10
}

fn default_shutdown_grace() -> u64 {
    30
}

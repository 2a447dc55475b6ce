//! Trims the user and item tables down to a fixed number of rows.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use filedrop_core::error::AppError;
use filedrop_core::result::AppResult;
use filedrop_database::repositories::{ItemRepository, UserRepository};

use crate::task::{JobExecutionError, ScheduledAction};

/// Result of capping one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapReport {
    /// Table name.
    pub kind: &'static str,
    /// Rows kept.
    pub cap: usize,
    /// Rows listed.
    pub scanned: usize,
    /// Rows deleted.
    pub removed: usize,
    /// Rows whose delete failed.
    pub failed: usize,
    /// Why the table could not be listed, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CapReport {
    fn new(kind: &'static str, cap: usize) -> Self {
        Self {
            kind,
            cap,
            ..Self::default()
        }
    }

    fn tally(&mut self, id: impl fmt::Display, result: AppResult<bool>) {
        match result {
            Ok(true) => self.removed += 1,
            Ok(false) => tracing::debug!("{} {} already removed", self.kind, id),
            Err(e) => {
                self.failed += 1;
                tracing::warn!("Failed to delete {} {}: {}", self.kind, id, e);
            }
        }
    }

    fn listing_failed(&mut self, e: AppError) {
        tracing::error!("Failed to list {}: {}", self.kind, e);
        self.error = Some(e.to_string());
    }
}

/// Outcome of one row-cap sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCapReport {
    /// User table result.
    pub users: CapReport,
    /// Item table result.
    pub items: CapReport,
}

/// Keeps the first `max_users` users and `max_items` items, in ascending
/// id order, and deletes the rest.
#[derive(Debug)]
pub struct RowCapSweepJob {
    users: Arc<dyn UserRepository>,
    items: Arc<dyn ItemRepository>,
    max_users: usize,
    max_items: usize,
}

impl RowCapSweepJob {
    /// Create a sweep with separate caps per table.
    pub fn new(
        users: Arc<dyn UserRepository>,
        items: Arc<dyn ItemRepository>,
        max_users: usize,
        max_items: usize,
    ) -> Self {
        Self {
            users,
            items,
            max_users,
            max_items,
        }
    }

    /// Cap users, then items.
    pub async fn sweep(&self) -> RowCapReport {
        RowCapReport {
            users: self.cap_users().await,
            items: self.cap_items().await,
        }
    }

    async fn cap_users(&self) -> CapReport {
        let mut report = CapReport::new("users", self.max_users);
        let rows = match self.users.list_users().await {
            Ok(rows) => rows,
            Err(e) => {
                report.listing_failed(e);
                return report;
            }
        };

        report.scanned = rows.len();
        for user in rows.iter().skip(self.max_users) {
            report.tally(user.id, self.users.delete_user(user.id).await);
        }
        if report.removed > 0 {
            tracing::info!("Removed {} user(s) over the cap of {}", report.removed, report.cap);
        }
        report
    }

    async fn cap_items(&self) -> CapReport {
        let mut report = CapReport::new("items", self.max_items);
        let rows = match self.items.list_items().await {
            Ok(rows) => rows,
            Err(e) => {
                report.listing_failed(e);
                return report;
            }
        };

        report.scanned = rows.len();
        for item in rows.iter().skip(self.max_items) {
            report.tally(item.id, self.items.delete_item(item.id).await);
        }
        if report.removed > 0 {
            tracing::info!("Removed {} item(s) over the cap of {}", report.removed, report.cap);
        }
        report
    }
}

#[async_trait]
impl ScheduledAction for RowCapSweepJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        let report = self.sweep().await;
        let summary = serde_json::to_value(&report).map_err(AppError::from)?;

        let failed: Vec<&str> = [&report.users, &report.items]
            .into_iter()
            .filter(|r| r.error.is_some())
            .map(|r| r.kind)
            .collect();
        if !failed.is_empty() {
            return Err(JobExecutionError::Transient(format!(
                "Could not list {}; summary: {}",
                failed.join(" and "),
                summary
            )));
        }
        Ok(Some(summary))
    }
}

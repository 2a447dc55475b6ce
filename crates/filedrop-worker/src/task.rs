//! The unit of work the scheduler runs.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use filedrop_core::error::AppError;

/// An action invoked on every tick of a scheduled task.
///
/// A successful run may return a JSON summary which the scheduler logs.
#[async_trait]
pub trait ScheduledAction: Send + Sync + fmt::Debug + 'static {
    /// Run the action once.
    async fn run(&self) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from one invocation of a scheduled action.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, the next tick will hit it again
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, the next tick may succeed
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Adapts an async closure into a [`ScheduledAction`].
pub struct FnAction<F> {
    label: &'static str,
    f: F,
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("label", &self.label).finish()
    }
}

#[async_trait]
impl<F, Fut> ScheduledAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
{
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        (self.f)().await
    }
}

/// Wrap a closure returning a future as a shareable action.
pub fn action_fn<F, Fut>(label: &'static str, f: F) -> Arc<dyn ScheduledAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
{
    Arc::new(FnAction { label, f })
}

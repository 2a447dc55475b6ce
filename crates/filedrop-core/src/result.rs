//! Convenience result type alias for FileDrop.

use crate::error::AppError;

/// A specialized `Result` type for FileDrop operations.
pub type AppResult<T> = Result<T, AppError>;

//! Convenience result type alias for PlugHub.

use crate::error::AppError;

/// A specialized `Result` type for PlugHub operations.
pub type AppResult<T> = Result<T, AppError>;

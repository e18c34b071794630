//! Controller error type.

use db::DbError;
use queue_core::QueueAction;
use thiserror::Error;

/// Result type for reconcile operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Error type for reconcile operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A store read or write failed. Passed through unchanged.
    #[error(transparent)]
    Store(#[from] DbError),

    /// A transition was requested without a lifecycle policy. This is a
    /// wiring defect, not a transient condition.
    #[error("internal error, lifecycle policy must be provided for {action}")]
    MissingPolicy { action: QueueAction },
}

impl ControllerError {
    /// Whether re-running the same reconcile later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ControllerError::Store(_))
    }
}

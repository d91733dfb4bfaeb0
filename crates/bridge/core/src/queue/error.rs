use iris_bridge_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// The outcome of a failed task execution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Preconditions are not met yet; run the task again after `delay`.
    ///
    /// Not a failure: the task's retry budget is left untouched.
    #[error("retry in {delay:?}: {reason}")]
    RetryLater {
        /// Why the task was postponed.
        reason: String,
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// A dependency was temporarily unavailable. Retried while the task has
    /// retry budget left.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The task failed and is dropped.
    #[error("{0}")]
    Fatal(String),
}

/// An error of the queue itself.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Task records could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The dispatcher stopped.
    #[error("task queue closed")]
    Closed,
}

//! Error types for the laika task executor

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by user work closures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared handle to a captured task failure.
///
/// A task's error is handed out both by [`Task::error`](crate::Task::error)
/// and by every [`Future::get`](crate::Future::get) call, so it lives behind
/// an `Arc` rather than a `Box`.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// The terminal outcome of a task, as seen by [`Future::get`](crate::Future::get).
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task's work returned an error or panicked. The original error is
    /// attached.
    #[error("task failed: {0}")]
    Failed(SharedError),

    /// The task was canceled before a worker could claim it.
    #[error("task was canceled")]
    Canceled,
}

impl TaskError {
    /// Check if this error indicates cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }

    /// The underlying failure, if the task failed rather than being canceled.
    pub fn cause(&self) -> Option<&SharedError> {
        match self {
            TaskError::Failed(error) => Some(error),
            TaskError::Canceled => None,
        }
    }
}

/// Errors produced by the combinator layer itself.
#[derive(Debug, Clone, Error)]
pub enum CombineError {
    /// `when_first` ran without any of its inputs having finished. This is
    /// only reachable when the input list is empty or every input was
    /// canceled out from under the combinator.
    #[error("no input future has finished")]
    NoFinishedInput,
}

/// A work closure panicked; the payload message is preserved.
#[derive(Debug, Clone, Error)]
#[error("task panicked: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "panic payload of unknown type".to_owned()
        };
        Self { message }
    }

    /// The panic message, as far as it could be recovered from the payload.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors related to executor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid worker thread count: {value} (must be > 0)")]
    InvalidNumThreads { value: usize },
}

impl ConfigError {
    /// Create an invalid worker thread count error.
    pub fn invalid_num_threads(value: usize) -> Self {
        ConfigError::InvalidNumThreads { value }
    }
}

/// Errors raised while constructing an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for operations observing a task's outcome.
pub type TaskResult<T> = Result<T, TaskError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for executor construction.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

//! Lifecycle observers for task execution
//!
//! An [`ExecutionReporter`] receives an event for every scheduling-relevant
//! transition a task goes through inside an executor. Reporters are shared
//! across worker threads, so implementations use interior mutability where
//! they need state.

use std::time::Duration;

use crate::task::TaskId;

/// Events emitted by the executor as tasks move through their lifecycle.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// The task was accepted by `submit` and enqueued.
    Submitted { task_id: TaskId },
    /// A worker claimed the task and is about to run its work.
    Started { task_id: TaskId },
    /// The task's work returned successfully.
    Completed { task_id: TaskId, duration: Duration },
    /// The task's work returned an error or panicked.
    Failed {
        task_id: TaskId,
        error: String,
        duration: Duration,
    },
    /// The executor canceled the task (submit after shutdown, or an unready
    /// task drained during shutdown).
    Canceled { task_id: TaskId },
}

impl TaskEvent {
    /// The task this event concerns.
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::Submitted { task_id }
            | TaskEvent::Started { task_id }
            | TaskEvent::Completed { task_id, .. }
            | TaskEvent::Failed { task_id, .. }
            | TaskEvent::Canceled { task_id } => *task_id,
        }
    }
}

/// Trait for observing task execution.
pub trait ExecutionReporter: Send + Sync {
    /// Report a lifecycle event.
    fn report(&self, event: &TaskEvent);
}

/// A reporter that discards all events.
#[derive(Debug, Default)]
pub struct NoOpReporter;

impl ExecutionReporter for NoOpReporter {
    fn report(&self, _event: &TaskEvent) {}
}

/// A reporter that forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TraceReporter;

impl ExecutionReporter for TraceReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Submitted { task_id } => {
                tracing::debug!(task = %task_id, "task submitted");
            }
            TaskEvent::Started { task_id } => {
                tracing::debug!(task = %task_id, "task started");
            }
            TaskEvent::Completed { task_id, duration } => {
                tracing::debug!(task = %task_id, ?duration, "task completed");
            }
            TaskEvent::Failed {
                task_id,
                error,
                duration,
            } => {
                tracing::warn!(task = %task_id, %error, ?duration, "task failed");
            }
            TaskEvent::Canceled { task_id } => {
                tracing::debug!(task = %task_id, "task canceled by executor");
            }
        }
    }
}

/// A reporter that broadcasts events to several others.
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn ExecutionReporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn add_reporter<R: ExecutionReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl ExecutionReporter for MultiReporter {
    fn report(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

//! Typed deferred values
//!
//! A [`Future`] pairs a [`Task`] with a slot for the value its work produces,
//! so callers can block on the result with [`get`](Future::get) instead of
//! just observing the task's terminal state.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BoxError, TaskError, TaskResult};
use crate::task::Task;

/// A task that yields a typed result.
///
/// `Future` dereferences to [`Task`], so the whole task API (readiness
/// wiring, `cancel`, `wait`, the status predicates) is available on it.
/// Cloning a `Future` clones the handle, not the computation.
pub struct Future<T> {
    task: Arc<Task>,
    output: Arc<Mutex<Option<T>>>,
}

impl<T: Send + 'static> Future<T> {
    /// Create a pending future around a value-producing closure.
    ///
    /// The future is not scheduled anywhere yet; submit its task to an
    /// executor (or use the executor's combinator constructors, which do
    /// both steps at once).
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T, BoxError> + Send + 'static,
    {
        let output = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&output);
        let task = Task::new(move || {
            let value = work()?;
            *slot.lock() = Some(value);
            Ok(())
        });
        Self { task, output }
    }

    /// Block until the task finishes, then surface its outcome.
    ///
    /// Returns the produced value on completion, [`TaskError::Failed`] with
    /// the captured error if the work failed, and [`TaskError::Canceled`] if
    /// the task was canceled before running.
    pub fn get(&self) -> TaskResult<T>
    where
        T: Clone,
    {
        self.task.wait();
        self.read_finished()
    }

    /// Non-blocking variant of [`get`](Future::get): `None` while the task
    /// is still unfinished.
    pub fn try_get(&self) -> Option<TaskResult<T>>
    where
        T: Clone,
    {
        if !self.task.is_finished() {
            return None;
        }
        Some(self.read_finished())
    }

    fn read_finished(&self) -> TaskResult<T>
    where
        T: Clone,
    {
        if self.task.is_canceled() {
            return Err(TaskError::Canceled);
        }
        if let Some(error) = self.task.error() {
            return Err(TaskError::Failed(error));
        }
        let value = self.output.lock().clone();
        Ok(value.expect("completed future holds a value"))
    }
}

impl<T> Future<T> {
    /// The underlying task handle, for readiness wiring and submission.
    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            task: Arc::clone(&self.task),
            output: Arc::clone(&self.output),
        }
    }
}

impl<T> Deref for Future<T> {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future").field("task", &self.task).finish()
    }
}

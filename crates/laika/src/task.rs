//! Task lifecycle core and readiness evaluation
//!
//! A [`Task`] is the unit of scheduling: a one-shot work closure together
//! with a status state machine and the declarative readiness constraints the
//! scheduler evaluates before running it. Tasks are shared as `Arc<Task>`
//! between user code, the ready-queue, and dependent tasks.

use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BoxError, SharedError};

/// Unique identifier for a task, used in logs and reporter events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new unique task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-shot work executed by a claiming worker.
pub(crate) type Work = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Lifecycle states.
///
/// `Running` is the claim sentinel: the worker that wins the transition from
/// `Pending` owns the work closure. It is deliberately not observable from
/// the public API; callers only see pending, finished, or the three terminal
/// outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl State {
    fn is_finished(self) -> bool {
        matches!(self, State::Completed | State::Failed | State::Canceled)
    }
}

struct Inner {
    state: State,
    error: Option<SharedError>,
    work: Option<Work>,
    dependencies: Vec<Arc<Task>>,
    triggers: Vec<Arc<Task>>,
    not_before: Instant,
}

/// A schedulable unit of work with a status lifecycle.
///
/// Status transitions are monotonic: once a task reports
/// [`is_finished`](Task::is_finished), its terminal state never changes.
///
/// Readiness constraints (dependencies, triggers, the time trigger) must be
/// configured before the task is submitted to an executor; the scheduler
/// assumes they are quiescent afterwards.
pub struct Task {
    id: TaskId,
    inner: Mutex<Inner>,
    finished: Condvar,
}

impl Task {
    /// Create a new pending task around a one-shot work closure.
    ///
    /// The closure reports failure by returning an error; the executor also
    /// captures panics into the task's error slot.
    pub fn new<F>(work: F) -> Arc<Self>
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        Arc::new(Self {
            id: TaskId::new(),
            inner: Mutex::new(Inner {
                state: State::Pending,
                error: None,
                work: Some(Box::new(work)),
                dependencies: Vec::new(),
                triggers: Vec::new(),
                not_before: Instant::now(),
            }),
            finished: Condvar::new(),
        })
    }

    /// This task's unique ID.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Require `dependency` to be finished (in any terminal state) before
    /// this task may run. Call before submitting.
    pub fn add_dependency(&self, dependency: Arc<Task>) {
        self.inner.lock().dependencies.push(dependency);
    }

    /// Let `trigger` finishing (in any terminal state) awaken this task.
    /// A task with triggers runs once at least one of them has finished.
    /// Call before submitting.
    pub fn add_trigger(&self, trigger: Arc<Task>) {
        self.inner.lock().triggers.push(trigger);
    }

    /// Forbid running before the given instant. Call before submitting.
    pub fn set_time_trigger(&self, at: Instant) {
        self.inner.lock().not_before = at;
    }

    /// Check if the work ran to successful completion.
    pub fn is_completed(&self) -> bool {
        self.state() == State::Completed
    }

    /// Check if the work returned an error or panicked.
    pub fn is_failed(&self) -> bool {
        self.state() == State::Failed
    }

    /// Check if the task was canceled before a worker claimed it.
    pub fn is_canceled(&self) -> bool {
        self.state() == State::Canceled
    }

    /// Check if the task reached any terminal state.
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// The captured failure, present iff the task failed.
    pub fn error(&self) -> Option<SharedError> {
        self.inner.lock().error.clone()
    }

    /// Cancel the task if it has not yet been claimed by a worker.
    ///
    /// Cancellation is cooperative only at the pre-run boundary: once a
    /// worker owns the work closure this is a no-op.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        if inner.state != State::Pending {
            return;
        }
        inner.state = State::Canceled;
        // The work closure and the readiness inputs are dead now; dropping
        // them promptly also breaks reference cycles through dependencies.
        inner.work = None;
        inner.dependencies.clear();
        inner.triggers.clear();
        tracing::debug!(task = %self.id, "task canceled");
        self.finished.notify_all();
    }

    /// Block the calling thread until the task is finished.
    pub fn wait(&self) {
        let mut inner = self.inner.lock();
        while !inner.state.is_finished() {
            self.finished.wait(&mut inner);
        }
    }

    /// Evaluate the readiness constraints: all dependencies finished, the
    /// time trigger reached, and (no triggers or at least one finished), in
    /// that order with short-circuiting.
    ///
    /// The inputs are snapshotted under this task's lock and the peer
    /// statuses are then read through the peers' own locks, so no two task
    /// locks are ever held at once and cyclic graphs cannot deadlock the
    /// evaluator.
    pub(crate) fn can_run(&self) -> bool {
        let (dependencies, triggers, not_before) = {
            let inner = self.inner.lock();
            (
                inner.dependencies.clone(),
                inner.triggers.clone(),
                inner.not_before,
            )
        };

        if !dependencies.iter().all(|dependency| dependency.is_finished()) {
            return false;
        }
        if Instant::now() < not_before {
            return false;
        }
        triggers.is_empty() || triggers.iter().any(|trigger| trigger.is_finished())
    }

    /// Atomically claim the task for execution.
    ///
    /// Exactly one caller wins the `Pending` to `Running` transition and
    /// receives the work closure; everyone else (duplicate queue handles,
    /// racing workers, post-cancel draws) gets `None`.
    pub(crate) fn try_claim(&self) -> Option<Work> {
        let mut inner = self.inner.lock();
        if inner.state != State::Pending {
            return None;
        }
        inner.state = State::Running;
        inner.work.take()
    }

    /// Record successful completion and release waiters.
    pub(crate) fn complete(&self) {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, State::Running);
        inner.state = State::Completed;
        inner.dependencies.clear();
        inner.triggers.clear();
        tracing::debug!(task = %self.id, "task completed");
        self.finished.notify_all();
    }

    /// Record a failure and release waiters.
    pub(crate) fn fail(&self, error: SharedError) {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, State::Running);
        inner.error = Some(error);
        inner.state = State::Failed;
        inner.dependencies.clear();
        inner.triggers.clear();
        tracing::debug!(task = %self.id, "task failed");
        self.finished.notify_all();
    }

    fn state(&self) -> State {
        self.inner.lock().state
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

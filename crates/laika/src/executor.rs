//! Thread-pool executor and deferred-value combinators
//!
//! The executor owns a fixed pool of worker threads draining a shared
//! [`BlockingQueue`] of task handles. Readiness is re-checked every time a
//! task is drawn from the queue: an unready task is re-enqueued at the tail
//! and revisited on a later cycle. There are no wakeup subscriptions, so the
//! latency between a task becoming ready and it running is bounded by one
//! trip through the queue.
//!
//! On top of raw task submission sit the combinators ([`invoke`](Executor::invoke),
//! [`then`](Executor::then), [`when_all`](Executor::when_all),
//! [`when_first`](Executor::when_first),
//! [`when_all_before_deadline`](Executor::when_all_before_deadline)), which
//! wire readiness constraints so their bodies see finished inputs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::config::ExecutorConfig;
use crate::error::{BoxError, CombineError, ExecutorResult, PanicError, SharedError};
use crate::future::Future;
use crate::queue::BlockingQueue;
use crate::reporter::{ExecutionReporter, NoOpReporter, TaskEvent};
use crate::task::{Task, Work};

/// Create a shared thread-pool executor with `num_threads` workers.
///
/// Convenience over [`Executor::with_config`]; panics if `num_threads` is
/// zero or a worker thread cannot be spawned.
pub fn thread_pool_executor(num_threads: usize) -> Arc<Executor> {
    Executor::new(num_threads)
}

/// A fixed-size pool of worker threads executing tasks once their readiness
/// constraints hold.
///
/// Dropping the executor performs [`start_shutdown`](Executor::start_shutdown)
/// followed by [`wait_shutdown`](Executor::wait_shutdown).
pub struct Executor {
    queue: Arc<BlockingQueue<Arc<Task>>>,
    reporter: Arc<dyn ExecutionReporter>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    joined: Mutex<bool>,
    all_joined: Condvar,
}

impl Executor {
    /// Create an executor with `num_threads` workers and default settings.
    ///
    /// Panics if `num_threads` is zero or a worker thread cannot be spawned;
    /// use [`Executor::with_config`] to handle those as errors.
    pub fn new(num_threads: usize) -> Arc<Self> {
        let config = ExecutorConfig {
            num_threads,
            ..ExecutorConfig::default()
        };
        Self::with_config(config).expect("failed to start executor worker pool")
    }

    /// Create an executor from a validated configuration.
    pub fn with_config(config: ExecutorConfig) -> ExecutorResult<Arc<Self>> {
        Self::build(config, Arc::new(NoOpReporter))
    }

    /// Create an executor that reports lifecycle events to `reporter`.
    pub fn with_reporter(
        config: ExecutorConfig,
        reporter: Arc<dyn ExecutionReporter>,
    ) -> ExecutorResult<Arc<Self>> {
        Self::build(config, reporter)
    }

    fn build(
        config: ExecutorConfig,
        reporter: Arc<dyn ExecutionReporter>,
    ) -> ExecutorResult<Arc<Self>> {
        config.validate()?;

        let queue = Arc::new(BlockingQueue::new());
        let mut workers = Vec::with_capacity(config.num_threads);
        for index in 0..config.num_threads {
            let worker_queue = Arc::clone(&queue);
            let worker_reporter = Arc::clone(&reporter);
            let spawned = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name_prefix))
                .spawn(move || worker_loop(index, worker_queue, worker_reporter));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => {
                    // Unwind the partially started pool before reporting.
                    queue.close();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(error.into());
                }
            }
        }

        debug!(num_threads = config.num_threads, "executor started");
        Ok(Arc::new(Self {
            queue,
            reporter,
            workers: Mutex::new(workers),
            joined: Mutex::new(false),
            all_joined: Condvar::new(),
        }))
    }

    /// Make a task eligible for scheduling.
    ///
    /// Submission never starts execution by itself; a worker runs the task
    /// once its readiness constraints hold. After
    /// [`start_shutdown`](Executor::start_shutdown) the task is canceled
    /// instead of enqueued. Submitting an already-canceled task is a no-op.
    pub fn submit(&self, task: &Arc<Task>) {
        if self.queue.is_closed() {
            self.cancel_rejected(task);
            return;
        }
        if task.is_canceled() {
            return;
        }
        // Report before enqueueing; a worker may start the task the instant
        // it lands in the queue.
        self.reporter.report(&TaskEvent::Submitted { task_id: task.id() });
        if !self.queue.put(Arc::clone(task)) {
            // close() won the race after the is_closed check above.
            self.cancel_rejected(task);
        }
    }

    /// Close the queue in drain mode. Idempotent.
    ///
    /// Already-enqueued ready tasks are still executed; enqueued tasks whose
    /// readiness is still false are canceled as workers drain them, so the
    /// pool always winds down. Subsequent submissions cancel their tasks.
    pub fn start_shutdown(&self) {
        debug!("executor shutdown requested");
        self.queue.close();
    }

    /// Block until every worker thread has exited. Idempotent and safe to
    /// call from several threads at once.
    pub fn wait_shutdown(&self) {
        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            // Another caller owns the join; wait for it to finish.
            let mut joined = self.joined.lock();
            while !*joined {
                self.all_joined.wait(&mut joined);
            }
            return;
        }

        for handle in handles {
            let _ = handle.join();
        }
        *self.joined.lock() = true;
        self.all_joined.notify_all();
        debug!("executor workers joined");
    }

    fn cancel_rejected(&self, task: &Arc<Task>) {
        task.cancel();
        if task.is_canceled() {
            self.reporter.report(&TaskEvent::Canceled { task_id: task.id() });
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.start_shutdown();
        self.wait_shutdown();
    }
}

// Combinator constructors. Each builds a `Future`, wires the readiness
// constraints that guarantee its body sees finished inputs, and submits it.
impl Executor {
    /// Run `work` on the pool and return a typed handle to its result.
    pub fn invoke<T, F>(&self, work: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, BoxError> + Send + 'static,
    {
        let future = Future::new(work);
        self.submit(future.task());
        future
    }

    /// Schedule `work` to run once `input` has finished.
    ///
    /// A failed or canceled `input` does NOT short-circuit: `work` runs
    /// regardless of how the input finished. Capture a clone of the input
    /// handle and inspect it inside `work` if its outcome matters.
    pub fn then<T, R, F>(&self, input: &Future<T>, work: F) -> Future<R>
    where
        R: Send + 'static,
        F: FnOnce() -> Result<R, BoxError> + Send + 'static,
    {
        let future = Future::new(work);
        future.add_dependency(Arc::clone(input.task()));
        self.submit(future.task());
        future
    }

    /// Collect the results of every input, in input order.
    ///
    /// The aggregate runs only after all inputs have finished, so it never
    /// blocks a worker waiting for them. If any input failed or was
    /// canceled, the first such outcome (in input order) becomes this
    /// future's error.
    pub fn when_all<T>(&self, inputs: Vec<Future<T>>) -> Future<Vec<T>>
    where
        T: Clone + Send + 'static,
    {
        let dependencies: Vec<Arc<Task>> =
            inputs.iter().map(|input| Arc::clone(input.task())).collect();

        let future = Future::new(move || {
            let mut values = Vec::with_capacity(inputs.len());
            for input in &inputs {
                values.push(input.get()?);
            }
            Ok(values)
        });
        for dependency in dependencies {
            future.add_dependency(dependency);
        }
        self.submit(future.task());
        future
    }

    /// Return the result of the first input to finish.
    ///
    /// "First" is the lowest input index among the finished inputs at the
    /// moment the body runs; that input's own failure or cancellation
    /// propagates through the returned future. If no input has finished
    /// (the list is empty, or every input was canceled out from under the
    /// combinator), the future fails with [`CombineError::NoFinishedInput`].
    pub fn when_first<T>(&self, inputs: Vec<Future<T>>) -> Future<T>
    where
        T: Clone + Send + 'static,
    {
        let triggers: Vec<Arc<Task>> =
            inputs.iter().map(|input| Arc::clone(input.task())).collect();

        let future = Future::new(move || {
            for input in &inputs {
                if input.is_finished() {
                    return input.get().map_err(BoxError::from);
                }
            }
            Err(CombineError::NoFinishedInput.into())
        });
        for trigger in triggers {
            future.add_trigger(trigger);
        }
        self.submit(future.task());
        future
    }

    /// Harvest the values of the inputs that completed before `deadline`,
    /// in input order.
    ///
    /// Inputs that are unfinished, failed, or canceled when the deadline
    /// fires are silently omitted; element failures never fail the harvest.
    pub fn when_all_before_deadline<T>(
        &self,
        inputs: Vec<Future<T>>,
        deadline: Instant,
    ) -> Future<Vec<T>>
    where
        T: Clone + Send + 'static,
    {
        let future = Future::new(move || {
            let mut values = Vec::new();
            for input in &inputs {
                if let Some(Ok(value)) = input.try_get() {
                    values.push(value);
                }
            }
            Ok(values)
        });
        future.set_time_trigger(deadline);
        self.submit(future.task());
        future
    }
}

fn worker_loop(
    worker_index: usize,
    queue: Arc<BlockingQueue<Arc<Task>>>,
    reporter: Arc<dyn ExecutionReporter>,
) {
    trace!(worker = worker_index, "worker started");
    while let Some(task) = queue.take() {
        if task.is_canceled() {
            continue;
        }
        if !task.can_run() {
            requeue_unready(&queue, task, &reporter);
            continue;
        }
        let Some(work) = task.try_claim() else {
            // Lost the claim race against another worker holding a
            // duplicate handle.
            continue;
        };
        run_claimed(&task, work, &reporter);
    }
    trace!(worker = worker_index, "worker exiting");
}

fn requeue_unready(
    queue: &BlockingQueue<Arc<Task>>,
    task: Arc<Task>,
    reporter: &Arc<dyn ExecutionReporter>,
) {
    if !queue.is_closed() && queue.put(Arc::clone(&task)) {
        // The queue may hold nothing but unready tasks; don't spin hot.
        thread::yield_now();
        return;
    }
    // Drain-mode shutdown: a task whose readiness is still false will never
    // be re-enqueued again, so cancel it and let the drain terminate.
    task.cancel();
    if task.is_canceled() {
        reporter.report(&TaskEvent::Canceled { task_id: task.id() });
    }
}

fn run_claimed(task: &Arc<Task>, work: Work, reporter: &Arc<dyn ExecutionReporter>) {
    let task_id = task.id();
    reporter.report(&TaskEvent::Started { task_id });
    let started = Instant::now();

    let outcome = panic::catch_unwind(AssertUnwindSafe(work));
    let duration = started.elapsed();

    match outcome {
        Ok(Ok(())) => {
            task.complete();
            reporter.report(&TaskEvent::Completed { task_id, duration });
        }
        Ok(Err(error)) => {
            let error: SharedError = Arc::from(error);
            task.fail(Arc::clone(&error));
            reporter.report(&TaskEvent::Failed {
                task_id,
                error: error.to_string(),
                duration,
            });
        }
        Err(payload) => {
            let error: SharedError = Arc::new(PanicError::from_payload(payload.as_ref()));
            task.fail(Arc::clone(&error));
            reporter.report(&TaskEvent::Failed {
                task_id,
                error: error.to_string(),
                duration,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_simple_task_completes() {
        let executor = Executor::new(2);
        let cell = Arc::new(AtomicUsize::new(0));

        let task_cell = Arc::clone(&cell);
        let task = Task::new(move || {
            task_cell.store(42, Ordering::SeqCst);
            Ok(())
        });
        executor.submit(&task);
        task.wait();

        assert!(task.is_completed());
        assert_eq!(cell.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_failure_is_captured_and_rethrown() {
        let executor = Executor::new(2);

        let future = executor.invoke(|| -> Result<i32, BoxError> { Err(Box::new(Boom)) });
        future.wait();

        assert!(future.is_failed());
        assert_eq!(future.error().unwrap().to_string(), "boom");
        match future.get() {
            Err(TaskError::Failed(error)) => assert_eq!(error.to_string(), "boom"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_dependency_orders_execution() {
        let executor = Executor::new(4);
        let order = Arc::new(StdMutex::new(Vec::new()));

        let first_order = Arc::clone(&order);
        let first = Task::new(move || {
            first_order.lock().unwrap().push("first");
            Ok(())
        });
        let second_order = Arc::clone(&order);
        let second = Task::new(move || {
            second_order.lock().unwrap().push("second");
            Ok(())
        });
        second.add_dependency(Arc::clone(&first));

        // Submit the dependent first to exercise the re-enqueue path.
        executor.submit(&second);
        executor.submit(&first);
        first.wait();
        second.wait();

        assert!(first.is_completed());
        assert!(second.is_completed());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_trigger_awakens_task() {
        let executor = Executor::new(2);
        let trigger = Task::new(|| Ok(()));
        let task = Task::new(|| Ok(()));
        task.add_trigger(Arc::clone(&trigger));

        executor.submit(&task);
        thread::sleep(Duration::from_millis(50));
        assert!(!task.is_finished());

        executor.submit(&trigger);
        task.wait();
        assert!(task.is_completed());
    }

    #[test]
    fn test_time_trigger_delays_execution() {
        let executor = Executor::new(2);
        let start = Instant::now();
        let delay = Duration::from_millis(200);

        let task = Task::new(|| Ok(()));
        task.set_time_trigger(start + delay);
        executor.submit(&task);
        task.wait();

        assert!(task.is_completed());
        assert!(start.elapsed() >= delay);
    }

    #[test]
    fn test_when_all_collects_in_input_order() {
        let executor = Executor::new(4);
        let inputs = vec![
            executor.invoke(|| Ok(1)),
            executor.invoke(|| Ok(2)),
            executor.invoke(|| Ok(3)),
        ];

        let all = executor.when_all(inputs);
        assert_eq!(all.get().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_when_all_accepts_empty_input() {
        let executor = Executor::new(2);
        let all: Future<Vec<i32>> = executor.when_all(Vec::new());
        assert_eq!(all.get().unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_when_all_propagates_first_failure() {
        let executor = Executor::new(4);
        let inputs = vec![
            executor.invoke(|| Ok(1)),
            executor.invoke(|| -> Result<i32, BoxError> { Err(Box::new(Boom)) }),
            executor.invoke(|| Ok(3)),
        ];

        let all = executor.when_all(inputs);
        match all.get() {
            Err(TaskError::Failed(error)) => {
                assert!(error.to_string().contains("boom"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_when_first_returns_earliest_finisher() {
        let executor = Executor::new(4);
        let slow = executor.invoke(|| {
            thread::sleep(Duration::from_millis(300));
            Ok(2)
        });
        let fast = executor.invoke(|| Ok(1));

        // The slow input comes first in the list; the scan must still find
        // the fast one once its trigger fires.
        let first = executor.when_first(vec![slow, fast]);
        assert_eq!(first.get().unwrap(), 1);
    }

    #[test]
    fn test_when_first_with_no_finished_input_fails() {
        let executor = Executor::new(2);
        let first: Future<i32> = executor.when_first(Vec::new());

        match first.get() {
            Err(TaskError::Failed(error)) => {
                assert_eq!(error.to_string(), "no input future has finished");
            }
            other => panic!("expected combinator failure, got {other:?}"),
        }
    }

    #[test]
    fn test_when_first_surfaces_canceled_input() {
        let executor = Executor::new(2);
        let canceled: Future<i32> = Future::new(|| Ok(1));
        canceled.cancel();

        let first = executor.when_first(vec![canceled]);
        match first.get() {
            Err(TaskError::Failed(error)) => {
                assert_eq!(error.to_string(), "task was canceled");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_deadline_harvest_omits_unfinished() {
        let executor = Executor::new(4);
        let start = Instant::now();

        let mut inputs = vec![executor.invoke(|| Ok(1)), executor.invoke(|| Ok(2))];
        for value in [3, 4, 5] {
            inputs.push(executor.invoke(move || {
                thread::sleep(Duration::from_millis(600));
                Ok(value)
            }));
        }

        let deadline = start + Duration::from_millis(120);
        let harvest = executor.when_all_before_deadline(inputs, deadline);
        let values = harvest.get().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(120));
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_deadline_harvest_ignores_failed_inputs() {
        let executor = Executor::new(2);
        let inputs = vec![
            executor.invoke(|| Ok(1)),
            executor.invoke(|| -> Result<i32, BoxError> { Err(Box::new(Boom)) }),
        ];

        let deadline = Instant::now() + Duration::from_millis(80);
        let harvest = executor.when_all_before_deadline(inputs, deadline);
        assert_eq!(harvest.get().unwrap(), vec![1]);
    }

    #[test]
    fn test_then_runs_after_input_regardless_of_failure() {
        let executor = Executor::new(2);
        let input = executor.invoke(|| -> Result<i32, BoxError> { Err(Box::new(Boom)) });

        let captured = input.clone();
        let follow = executor.then(&input, move || {
            Ok(match captured.get() {
                Ok(value) => value,
                Err(_) => -1,
            })
        });

        assert_eq!(follow.get().unwrap(), -1);
    }

    #[test]
    fn test_cancel_pre_run_never_executes() {
        let executor = Executor::new(2);
        let ran = Arc::new(AtomicUsize::new(0));

        let never = Task::new(|| Ok(()));
        let task_ran = Arc::clone(&ran);
        let task = Task::new(move || {
            task_ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        task.add_trigger(Arc::clone(&never));

        executor.submit(&task);
        thread::sleep(Duration::from_millis(30));
        task.cancel();
        task.wait();

        assert!(task.is_canceled());
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        executor.start_shutdown();
        executor.wait_shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_cancels() {
        let executor = Executor::new(2);
        executor.start_shutdown();

        let ran = Arc::new(AtomicUsize::new(0));
        let task_ran = Arc::clone(&ran);
        let task = Task::new(move || {
            task_ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        executor.submit(&task);

        assert!(task.is_canceled());
        executor.wait_shutdown();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shutdown_cancels_unready_leftovers() {
        let executor = Executor::new(2);
        let never = Task::new(|| Ok(()));
        let task = Task::new(|| Ok(()));
        task.add_trigger(Arc::clone(&never));

        executor.submit(&task);
        executor.start_shutdown();
        executor.wait_shutdown();

        assert!(task.is_canceled());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let executor = Executor::new(2);
        let future = executor.invoke(|| Ok(7));
        assert_eq!(future.get().unwrap(), 7);

        executor.start_shutdown();
        executor.start_shutdown();
        executor.wait_shutdown();
        executor.wait_shutdown();
    }

    #[test]
    fn test_wait_shutdown_from_multiple_threads() {
        let executor = Executor::new(2);
        executor.start_shutdown();

        let other = Arc::clone(&executor);
        let waiter = thread::spawn(move || other.wait_shutdown());
        executor.wait_shutdown();
        waiter.join().unwrap();
    }

    #[test]
    fn test_duplicate_submission_runs_once() {
        let executor = Executor::new(4);
        let runs = Arc::new(AtomicUsize::new(0));

        let task_runs = Arc::clone(&runs);
        let task = Task::new(move || {
            task_runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        executor.submit(&task);
        executor.submit(&task);
        task.wait();

        executor.start_shutdown();
        executor.wait_shutdown();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_becomes_task_failure() {
        let executor = Executor::new(2);
        let future = executor.invoke(|| -> Result<i32, BoxError> { panic!("kaboom") });

        match future.get() {
            Err(TaskError::Failed(error)) => {
                assert!(error.to_string().contains("kaboom"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // The worker that caught the panic keeps serving tasks.
        assert_eq!(executor.invoke(|| Ok(5)).get().unwrap(), 5);
    }

    #[test]
    fn test_drop_shuts_down_cleanly() {
        let result = {
            let executor = Executor::new(2);
            executor.invoke(|| Ok("done")).get()
        };
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn test_reporter_sees_lifecycle() {
        #[derive(Default)]
        struct CollectingReporter {
            events: StdMutex<Vec<String>>,
        }

        impl ExecutionReporter for CollectingReporter {
            fn report(&self, event: &TaskEvent) {
                let label = match event {
                    TaskEvent::Submitted { .. } => "submitted",
                    TaskEvent::Started { .. } => "started",
                    TaskEvent::Completed { .. } => "completed",
                    TaskEvent::Failed { .. } => "failed",
                    TaskEvent::Canceled { .. } => "canceled",
                };
                self.events.lock().unwrap().push(label.to_owned());
            }
        }

        let reporter = Arc::new(CollectingReporter::default());
        let shared: Arc<dyn ExecutionReporter> = reporter.clone();
        let executor = Executor::with_reporter(ExecutorConfig::for_testing(), shared).unwrap();

        let future = executor.invoke(|| Ok(1));
        assert_eq!(future.get().unwrap(), 1);
        executor.start_shutdown();
        executor.wait_shutdown();

        let events = reporter.events.lock().unwrap().clone();
        assert_eq!(events, vec!["submitted", "started", "completed"]);
    }
}

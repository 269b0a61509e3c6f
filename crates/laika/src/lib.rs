//! laika - a thread-pool task executor with deferred-value combinators
//!
//! A task execution engine built on a fixed pool of OS worker threads. Tasks
//! are units of work with a status lifecycle and declarative readiness
//! constraints; a task runs only once every prerequisite task has finished,
//! its time trigger has passed, and (if it has awakening triggers) at least
//! one of them has finished.
//!
//! # Overview
//!
//! Three layers, leaves first:
//! - [`BlockingQueue`] - an unbounded blocking MPMC channel of task handles
//!   with drain-then-stop and discard-and-stop shutdown modes.
//! - [`Executor`] - the fixed worker pool. Workers draw handles from the
//!   queue, re-check readiness, re-enqueue what cannot run yet, and claim
//!   and execute what can. Exactly one worker runs a given task.
//! - [`Task`] and [`Future`] - the lifecycle-bearing unit of work, and its
//!   typed specialization whose [`get`](Future::get) blocks for the produced
//!   value, repropagates failures, and signals cancellation. The combinator
//!   constructors on [`Executor`] ([`invoke`](Executor::invoke),
//!   [`then`](Executor::then), [`when_all`](Executor::when_all),
//!   [`when_first`](Executor::when_first),
//!   [`when_all_before_deadline`](Executor::when_all_before_deadline)) wire
//!   readiness constraints and submit a future in one step.
//!
//! Blocking on a future from inside a task occupies a worker for the whole
//! wait; size pools above the depth of any hand-rolled aggregation that does
//! this. The built-in combinators wire dependencies or triggers instead, so
//! their bodies only ever observe already-finished inputs.
//!
//! # Example
//!
//! ```
//! use laika::thread_pool_executor;
//!
//! let executor = thread_pool_executor(4);
//!
//! let doubled = executor.invoke(|| Ok(21 * 2));
//! let formatted = {
//!     let doubled = doubled.clone();
//!     let doubled_for_closure = doubled.clone();
//!     executor.then(&doubled, move || Ok(format!("answer: {}", doubled_for_closure.get()?)))
//! };
//!
//! assert_eq!(formatted.get().unwrap(), "answer: 42");
//!
//! executor.start_shutdown();
//! executor.wait_shutdown();
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod future;
pub mod queue;
pub mod reporter;
pub mod task;

pub use config::ExecutorConfig;
pub use error::{
    BoxError, CombineError, ConfigError, ConfigResult, ExecutorError, ExecutorResult, PanicError,
    SharedError, TaskError, TaskResult,
};
pub use executor::{thread_pool_executor, Executor};
pub use future::Future;
pub use queue::BlockingQueue;
pub use reporter::{ExecutionReporter, MultiReporter, NoOpReporter, TaskEvent, TraceReporter};
pub use task::{Task, TaskId};

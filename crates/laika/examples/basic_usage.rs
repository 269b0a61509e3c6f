//! Basic usage of the laika executor
//!
//! This example submits a raw task, waits on it, and then uses `invoke` to
//! get a typed result back from the pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use laika::{thread_pool_executor, Task};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== Basic laika usage ===\n");

    let executor = thread_pool_executor(4);

    // A raw task: a one-shot closure with a status lifecycle.
    let counter = Arc::new(AtomicU64::new(0));
    let task_counter = Arc::clone(&counter);
    let task = Task::new(move || {
        task_counter.store(42, Ordering::SeqCst);
        Ok(())
    });

    executor.submit(&task);
    task.wait();
    println!(
        "task {} finished, counter = {}",
        task.id(),
        counter.load(Ordering::SeqCst)
    );

    // A future: the same thing, but with a typed result to block on.
    let sum = executor.invoke(|| Ok((1..=100).sum::<i64>()));
    println!("sum of 1..=100 = {}", sum.get()?);

    executor.start_shutdown();
    executor.wait_shutdown();

    println!("\n=== Example completed ===");
    Ok(())
}

//! Harvesting whatever finished before a cut-off
//!
//! `when_all_before_deadline` collects the values of the inputs that
//! completed before a wall-clock deadline and silently omits the rest.

use std::thread;
use std::time::{Duration, Instant};

use laika::thread_pool_executor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Deadline harvest ===\n");

    let executor = thread_pool_executor(8);
    let start = Instant::now();

    // Five probes with spread-out latencies; only some beat the deadline.
    let probes = [10u64, 40, 80, 300, 500]
        .into_iter()
        .map(|latency_ms| {
            executor.invoke(move || {
                thread::sleep(Duration::from_millis(latency_ms));
                Ok(latency_ms)
            })
        })
        .collect();

    let deadline = start + Duration::from_millis(150);
    let harvest = executor.when_all_before_deadline(probes, deadline);

    let values = harvest.get()?;
    println!(
        "harvested {} of 5 probes after {:?}: {:?}",
        values.len(),
        start.elapsed(),
        values
    );

    executor.start_shutdown();
    executor.wait_shutdown();

    println!("\n=== Example completed ===");
    Ok(())
}

//! Composing futures with the combinator layer
//!
//! Builds a small pipeline: independent `invoke` stages fanned in with
//! `when_all`, a racing pair resolved with `when_first`, and a follow-on
//! stage chained with `then`.

use std::thread;
use std::time::Duration;

use laika::thread_pool_executor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Combinator pipeline ===\n");

    let executor = thread_pool_executor(4);

    // Fan-in: collect every shard's result in input order.
    let shards = (0..4)
        .map(|shard| {
            executor.invoke(move || {
                thread::sleep(Duration::from_millis(20 * shard));
                Ok(shard * 100)
            })
        })
        .collect();
    let gathered = executor.when_all(shards);
    println!("when_all     -> {:?}", gathered.get()?);

    // Race: take whichever replica answers first.
    let slow_replica = executor.invoke(|| {
        thread::sleep(Duration::from_millis(200));
        Ok("slow replica")
    });
    let fast_replica = executor.invoke(|| Ok("fast replica"));
    let winner = executor.when_first(vec![slow_replica, fast_replica]);
    println!("when_first   -> {}", winner.get()?);

    // Chain: the follow-on runs after its input finished, however it
    // finished, and decides for itself what to do with the outcome.
    let backend_up = false;
    let risky = executor.invoke(move || {
        if backend_up {
            Ok(7)
        } else {
            Err("flaky backend".into())
        }
    });
    let fallback = {
        let risky = risky.clone();
        let risky_for_closure = risky.clone();
        executor.then(&risky, move || Ok(risky_for_closure.get().unwrap_or(0)))
    };
    println!("then         -> {} (fallback applied)", fallback.get()?);

    executor.start_shutdown();
    executor.wait_shutdown();

    println!("\n=== Example completed ===");
    Ok(())
}

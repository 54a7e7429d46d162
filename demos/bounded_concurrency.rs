//! # Example: bounded_concurrency
//!
//! Shows the funnel limiting how many calls execute at once.
//!
//! Demonstrates how to:
//! - Start a backend with `Options::concurrency`.
//! - Observe queue time vs execution time in each [`ResultEnvelope`](immediate::ResultEnvelope).
//! - Raise the limit at runtime with [`Backend::set_concurrency`].
//!
//! ## Flow
//! ```text
//! concurrency = 2, 6 calls of 100ms
//!   t=0    [#0 #1] running, #2..#5 pending
//!   t=100  [#2 #3] running, #4 #5 pending
//!   set_concurrency(0) ──► #4 #5 admitted immediately
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example bounded_concurrency
//! ```

use std::time::{Duration, Instant};

use immediate::{Args, Backend, FunctionCall, FunctionFn, ImmediateBackend, Module, Options};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let module = Module::new("./functions").with_function(FunctionFn::arc(
        "work",
        |args: Args| async move {
            let ms: u64 = args.get(0)?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            anyhow::Ok(json!(ms))
        },
    ));

    let backend = ImmediateBackend::new();
    backend
        .initialize(module, Options::default().with_concurrency(2))
        .await?;

    let t0 = Instant::now();
    let calls = (0..6)
        .map(|_| backend.call_function(&FunctionCall::new("work").arg(100)))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(ex) = backend.executor() {
        println!(
            "limit=2 executing={} pending={}",
            ex.funnel().executing_len(),
            ex.funnel().pending_len()
        );
    }

    // Let the first two batches run under the limit, then lift it.
    tokio::time::sleep(Duration::from_millis(150)).await;
    backend.set_concurrency(0).await?;

    for (i, env) in futures::future::join_all(calls).await.into_iter().enumerate() {
        let env = env?;
        println!(
            "#{i}: queued {:>4}ms, executed {:>4}ms",
            env.queue_time().as_millis(),
            env.execution_time().as_millis()
        );
    }
    println!("total: {}ms", t0.elapsed().as_millis());

    backend.cleanup().await?;
    Ok(())
}

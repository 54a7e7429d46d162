//! # Example: graceful_stop
//!
//! Shows what `stop()` does with calls that are running and calls that are waiting.
//!
//! Demonstrates how to:
//! - Attach the built-in [`LogWriter`] and render events with `tracing-subscriber`.
//! - Stop a backend while its funnel is full.
//! - Tell finished calls from cancelled ones.
//!
//! ## Flow
//! ```text
//! concurrency = 1
//!   call #0 (running)  ──► stop() waits for it ──► Ok(envelope)
//!   call #1 (pending)  ──► cleared by stop()    ──► Err(Cancelled)
//!   call #2 (pending)  ──► cleared by stop()    ──► Err(Cancelled)
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! cargo run --example graceful_stop --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use immediate::{
    Args, Backend, CallError, FunctionCall, FunctionFn, ImmediateBackend, LogWriter, Module,
    Options,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let backend = ImmediateBackend::builder()
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    let module = Module::new("./functions").with_function(FunctionFn::arc(
        "slow",
        |args: Args| async move {
            let ms: u64 = args.get(0)?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            anyhow::Ok(json!("done"))
        },
    ));
    backend
        .initialize(module, Options::default().with_concurrency(1))
        .await?;

    let calls = (0..3)
        .map(|_| backend.call_function(&FunctionCall::new("slow").arg(200)))
        .collect::<Result<Vec<_>, _>>()?;

    tokio::time::sleep(Duration::from_millis(20)).await;
    backend.stop().await?;

    for (i, call) in calls.into_iter().enumerate() {
        match call.await {
            Ok(env) => println!("#{i}: finished after {:?}", env.execution_time()),
            Err(CallError::Cancelled) => println!("#{i}: cancelled before it started"),
            Err(e) => println!("#{i}: {e}"),
        }
    }

    backend.cleanup().await?;
    Ok(())
}

//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for call lifecycle metrics.
//! - Wire the subscriber in with [`ImmediateBackend::builder`].
//!
//! ## Flow
//! ```text
//! ImmediateBackend::initialize()
//!     ├─► publish(OptionIgnored)            (timeout is set but has no effect)
//!     ├─► call_function()
//!     │     ├─► publish(CallQueued)
//!     │     ├─► publish(CallStarted)
//!     │     └─► publish(CallReturned | CallFailed)
//!     └─► backend listener ──► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use immediate::{
    Args, Backend, Event, EventKind, FunctionCall, FunctionFn, ImmediateBackend, Module, Options,
    Subscribe,
};
use serde_json::json;

/// A simple console subscriber that prints selected events and counts failures.
/// In real life, you could export metrics, ship logs, or trigger alerts.
#[derive(Default)]
struct ConsoleSubscriber {
    failures: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let function = ev.name.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            EventKind::CallStarted => {
                println!("[sub] started:  {function} call={}", ev.call_id.unwrap_or(0));
            }
            EventKind::CallReturned => {
                println!(
                    "[sub] returned: {function} in {}ms",
                    ev.elapsed_ms.unwrap_or(0)
                );
            }
            EventKind::CallFailed => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                println!(
                    "[sub] failed:   {function} reason={}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::OptionIgnored => {
                println!("[sub] ignored option: {function}");
            }
            EventKind::Drained => {
                println!("[sub] drained {} call(s)", ev.count.unwrap_or(0));
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let console = Arc::new(ConsoleSubscriber::default());
    let backend = ImmediateBackend::builder()
        .with_subscriber(console.clone())
        .build();

    let module = Module::new("./functions")
        .with_function(FunctionFn::arc("echo", |args: Args| async move {
            let v: serde_json::Value = args.get(0)?;
            anyhow::Ok(v)
        }))
        .with_function(FunctionFn::arc("flaky", |args: Args| async move {
            let n: u32 = args.get(0)?;
            anyhow::ensure!(n % 2 == 0, "odd input {n}");
            anyhow::Ok(json!(n / 2))
        }));

    let mut options = Options::default();
    options.timeout = Some(Duration::from_secs(60));
    backend.initialize(module, options).await?;

    backend
        .call_function(&FunctionCall::new("echo").arg("ping"))?
        .await?;
    for n in 0..4u32 {
        backend
            .call_function(&FunctionCall::new("flaky").arg(n))?
            .await?;
    }

    // cleanup() waits until subscribers have seen every event.
    backend.cleanup().await?;
    println!("failures seen: {}", console.failures.load(Ordering::Relaxed));
    Ok(())
}

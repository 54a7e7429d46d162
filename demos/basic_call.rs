//! # Example: basic_call
//!
//! Minimal example: one module, one backend, a few calls.
//!
//! Demonstrates how to:
//! - Export functions with [`FunctionFn`] and group them in a [`Module`].
//! - Initialize an [`ImmediateBackend`] and call functions through [`Backend`].
//! - Read returned values and captured errors from the [`ResultEnvelope`].
//!
//! ## Flow
//! ```text
//! Module ──► ImmediateBackend::initialize()
//!     ├─► call_function("greet")   ──► Returned("Hello, world!")
//!     ├─► call_function("divide")  ──► Error(details)  (target failure is data)
//!     ├─► call_function(NaN arg)   ──► Err(UnsupportedArgument)  (synchronous)
//!     └─► cleanup()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_call
//! ```

use immediate::{
    Args, Backend, FunctionCall, FunctionFn, ImmediateBackend, Module, Options, Outcome,
    ResultEnvelope,
};
use serde_json::json;

fn describe(env: &ResultEnvelope) -> String {
    match &env.returned.outcome {
        Outcome::Returned(v) => format!("returned {v} in {:?}", env.execution_time()),
        Outcome::Error(e) => format!("failed [{}] {}", e.name, e.message),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Export functions
    let module = Module::new("./functions")
        .with_function(FunctionFn::arc("greet", |args: Args| async move {
            let who: String = args.get(0)?;
            anyhow::Ok(json!(format!("Hello, {who}!")))
        }))
        .with_function(FunctionFn::arc("divide", |args: Args| async move {
            let (a, b): (i64, i64) = (args.get(0)?, args.get(1)?);
            anyhow::ensure!(b != 0, "division by zero");
            anyhow::Ok(json!(a / b))
        }));

    // 2. Initialize backend (concurrency 0 = unlimited)
    let backend = ImmediateBackend::new();
    backend.initialize(module, Options::default()).await?;

    // 3. Successful call
    let env = backend
        .call_function(&FunctionCall::new("greet").arg("world"))?
        .await?;
    println!("greet:  {}", describe(&env));

    // 4. Failing target: still Ok(envelope)
    let env = backend
        .call_function(&FunctionCall::new("divide").arg(1).arg(0))?
        .await?;
    println!("divide: {}", describe(&env));

    // 5. Unrepresentable argument: rejected before anything is queued
    match backend.call_function(&FunctionCall::new("divide").arg(f64::NAN)) {
        Ok(_) => println!("NaN accepted?"),
        Err(e) => println!("NaN:    {e}"),
    }

    backend.cleanup().await?;
    Ok(())
}

//! # immediate
//!
//! **immediate** is an in-process execution backend for remote function calls.
//!
//! It runs the same [`FunctionCall`]s a cloud provider would run, with the same
//! result shape and a bounded concurrency funnel, but inside the current
//! process. Use it for local development and tests of code that normally
//! targets a remote backend.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ FunctionCall │   │ FunctionCall │   │ FunctionCall │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ImmediateBackend (Uninitialized ─► Ready ─► Stopped)             │
//! │  - Executor: encode ─► Funnel::push ─► ExecutionHost::execute     │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ funnel task  │   │ funnel task  │   │ (pending)    │   │
//!     │ host.execute │   │ host.execute │   │ FIFO queue   │   │
//!     └┬─────────────┘   └┬─────────────┘   └──────────────┘   │
//!      │ CallStarted      │ CallStarted                        │
//!      │ CallReturned     │ CallFailed                         │
//!      ▼                  ▼                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Options::bus_capacity)               │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    backend listener    │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                   sub1.on    sub2.on     subN.on
//!                   _event()   _event()    _event()
//! ```
//!
//! ### Call lifecycle
//! ```text
//! call_function(call)
//!   ├─► encode(call) ── unsupported argument ──► Err(CallError) (synchronous)
//!   ├─► funnel.push(task)  (starts now if under the limit, otherwise waits FIFO)
//!   │
//!   │   task:
//!   │     ├─► start = now
//!   │     ├─► host.execute(call, start)
//!   │     │       ├─ Ok  ──► ExecutionResult { Returned(value) }
//!   │     │       └─ Err ──► ExecutionResult { Error(details) }  (never an Err)
//!   │     └─► ResultEnvelope { returned, local_request_sent = start, ..., local_end }
//!   │
//!   └─► PendingCall resolves to Ok(envelope)
//!                          or Err(Cancelled) if stop() cleared it before it started
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Backend**       | Lifecycle and provider operations.                             | [`Backend`], [`ImmediateBackend`]           |
//! | **Calls**         | Requests, canonical encoding, results with timing.             | [`FunctionCall`], [`ResultEnvelope`]        |
//! | **Host**          | Functions the backend can call.                                | [`Module`], [`Function`], [`FunctionFn`]    |
//! | **Funnel**        | Bounded concurrency for any async task.                        | [`Funnel`], [`Admission`]                   |
//! | **Subscriber API**| Hook into call lifecycle events (logging, metrics, custom).    | [`Subscribe`]                               |
//! | **Errors**        | Typed errors for requests, lifecycle and execution.            | [`CallError`], [`HostError`]                |
//! | **Configuration** | Concurrency and provider options.                              | [`Options`]                                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use immediate::{Args, Backend, FunctionCall, FunctionFn, ImmediateBackend, Module, Options};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let module = Module::new("./functions").with_function(FunctionFn::arc(
//!         "add",
//!         |args: Args| async move {
//!             let (a, b): (i64, i64) = (args.get(0)?, args.get(1)?);
//!             anyhow::Ok(serde_json::json!(a + b))
//!         },
//!     ));
//!
//!     let backend = ImmediateBackend::new();
//!     backend.initialize(module, Options::default().with_concurrency(2)).await?;
//!
//!     let env = backend
//!         .call_function(&FunctionCall::new("add").arg(2).arg(3))?
//!         .await?;
//!     assert_eq!(env.returned.value(), Some(&serde_json::json!(5)));
//!
//!     backend.cleanup().await?;
//!     Ok(())
//! }
//! ```
mod call;
mod config;
mod core;
mod error;
mod events;
mod funnel;
mod host;
mod provider;
mod subscribers;

// ---- Public re-exports ----

pub use call::{
    CallableFn, CanonicalCall, ErrorDetails, ExecutionResult, FunctionCall, Outcome, RawResponse,
    ResultEnvelope, Value, encode,
};
pub use config::Options;
pub use crate::core::{
    BackendBuilder, BackendState, Executor, IMMEDIATE, ImmediateBackend, PendingCall,
};
pub use error::{CallError, HostError};
pub use events::{Bus, Event, EventKind};
pub use funnel::{Admission, Completion, Drained, Funnel, FunnelError};
pub use host::{Args, ExecutionHost, Function, FunctionFn, FunctionRef, Module};
pub use provider::{Backend, Logger, PackResult};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

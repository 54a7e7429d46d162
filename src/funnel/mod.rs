//! # Funnel: bounded concurrency for async tasks.
//!
//! A [`Funnel`] admits an unbounded stream of task closures and keeps at most
//! `max_concurrency` of them executing at once (`0` = no limit).
//!
//! ## Architecture
//! ```text
//! push(task) ──► pending (FIFO) ──admit()──► executing {id → Completion} ──► tokio::spawn
//!                    ▲                              │
//!                    │                              ▼ task settles
//!                    └─────── admit() again ◄── remove(id), signal Completion
//!
//! clear_pending()          : pending ──► Admission resolves Err(Cancelled)
//! set_max_concurrency(n)   : update limit, admit() (never preempts)
//! executing()              : snapshot of Completions
//! ```
//!
//! ## Rules
//! - `|executing| ≤ max_concurrency` whenever a limit is set; a lowered limit is
//!   reached by attrition, not by preemption
//! - Queued tasks **start** in push order; completion order is unconstrained
//! - Every pushed task either starts or is cancelled by `clear_pending`, never both
//! - A task's error or panic reaches only its own [`Admission`]; bookkeeping never fails
//! - Admitted tasks run to completion even if their `Admission` is dropped
//!
//! ## Example
//! ```rust
//! use immediate::Funnel;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let funnel = Funnel::new(2);
//! let a = funnel.push(|| async { 1 });
//! let b = funnel.push(|| async { 2 });
//! let c = funnel.push(|| async { 3 });
//! assert_eq!(funnel.pending_len(), 1);
//!
//! assert_eq!(a.await, Ok(1));
//! assert_eq!(b.await, Ok(2));
//! assert_eq!(c.await, Ok(3));
//! # }
//! ```

mod admission;
mod error;
mod funnel;

pub use admission::{Admission, Completion};
pub use error::FunnelError;
pub use funnel::{Drained, Funnel};

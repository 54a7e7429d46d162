//! Backend core: lifecycle and call execution.
//!
//! Public API from this module:
//! - [`ImmediateBackend`]: the [`Backend`](crate::Backend) state machine;
//! - [`BackendBuilder`]: attaches subscribers before `initialize`;
//! - [`Executor`]: funnel plus execution host of a ready backend;
//! - [`PendingCall`]: future of one scheduled call.
//!
//! Internal modules:
//! - [`executor`]: encodes calls, schedules them on the funnel, builds envelopes;
//! - [`backend`]: lifecycle states, event listener, provider operations;
//! - [`builder`]: backend construction.

mod backend;
mod builder;
mod executor;

pub use backend::{BackendState, IMMEDIATE, ImmediateBackend};
pub use builder::BackendBuilder;
pub use executor::{Executor, PendingCall};

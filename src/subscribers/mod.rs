//! # Event subscribers.
//!
//! ```text
//! Executor ── publish(Event) ──► Bus ──► backend listener ──► SubscriberSet::emit()
//!                                                                 │
//!                                              ┌──────────────────┼──────────────┐
//!                                              ▼                  ▼              ▼
//!                                          LogWriter          Metrics         Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use immediate::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::CallFailed {
//!             // increment failure counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

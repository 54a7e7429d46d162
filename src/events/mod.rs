//! Backend events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted while calls move through the funnel.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Executor` (queue/start/finish of calls, drain),
//!   `ImmediateBackend::initialize` (ignored options), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the backend listener task that fans events out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

//! # Event bus for broadcasting backend events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that the executor, the backend and
//! subscriber workers can publish without ever blocking a call in flight.
//!
//! ```text
//! Publishers (many):                   Listener (one per backend):
//!   Executor::call_function ──┐
//!   funnel task closures   ───┼──► Bus ──► backend listener ──► SubscriberSet
//!   Executor::stop         ───┤
//!   SubscriberSet workers  ───┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - A lagging receiver gets `RecvError::Lagged(n)` and skips the `n` oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for backend events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

//! # Events emitted by the backend and its executor.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Call events**: one call moving through the funnel (queued, started, returned, failed)
//! - **Control events**: concurrency changes, ignored options, stop and drain
//! - **Subscriber events**: delivery problems of the fan-out itself
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use immediate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CallFailed)
//!     .with_name("divide")
//!     .with_call_id(7)
//!     .with_reason("division by zero");
//!
//! assert_eq!(ev.kind, EventKind::CallFailed);
//! assert_eq!(ev.name.as_deref(), Some("divide"));
//! assert_eq!(ev.call_id, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of backend events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Call events ===
    /// Call encoded and pushed into the funnel.
    ///
    /// Sets: `name` (function), `call_id`
    CallQueued,

    /// Funnel admitted the call; the host is about to execute it.
    ///
    /// Sets: `name`, `call_id`
    CallStarted,

    /// Target function returned a value.
    ///
    /// Sets: `name`, `call_id`, `elapsed_ms`
    CallReturned,

    /// Target function failed; the failure is carried in the envelope as data.
    ///
    /// Sets: `name`, `call_id`, `elapsed_ms`, `reason`
    CallFailed,

    // === Control events ===
    /// Pending (not yet started) calls were discarded.
    ///
    /// Sets: `count` (number of discarded calls)
    PendingCleared,

    /// Funnel concurrency limit changed.
    ///
    /// Sets: `concurrency` (`0` = unlimited)
    ConcurrencyChanged,

    /// An option meaningful only to remote backends was set and ignored.
    ///
    /// Sets: `name` (option)
    OptionIgnored,

    /// `stop` or `cleanup` was requested.
    StopRequested,

    /// Every call that was executing when stop began has settled.
    ///
    /// Sets: `count` (number of calls awaited), `elapsed_ms`
    Drained,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `name` (subscriber), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `name` (subscriber), `reason` (panic info)
    SubscriberPanicked,
}

/// Backend event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Function, option, or subscriber name depending on `kind`.
    pub name: Option<Arc<str>>,
    /// Canonical call id.
    pub call_id: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Concurrency limit after a change.
    pub concurrency: Option<usize>,
    /// Number of calls affected.
    pub count: Option<usize>,
    /// Duration in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
            call_id: None,
            reason: None,
            concurrency: None,
            count: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a function/option/subscriber name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a call id.
    #[inline]
    pub fn with_call_id(mut self, id: u64) -> Self {
        self.call_id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a concurrency limit.
    #[inline]
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n);
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// True for events reporting a delivery problem of a subscriber.
    #[inline]
    pub fn is_subscriber_fault(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }

    /// True for events describing a single call.
    #[inline]
    pub fn is_call_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::CallQueued
                | EventKind::CallStarted
                | EventKind::CallReturned
                | EventKind::CallFailed
        )
    }
}

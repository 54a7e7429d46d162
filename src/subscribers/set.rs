//! # Non-blocking event fan-out to multiple subscribers.
//!
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - `emit()` returns immediately (`try_send`); calls in flight are never delayed by subscribers
//! - On a full queue the event is dropped for that subscriber and `SubscriberOverflow` is published
//! - Each subscriber sees events in publish order; there is no cross-subscriber ordering
//! - A panicking subscriber is isolated with `catch_unwind` and keeps receiving events
//! - Panics while handling `SubscriberPanicked` are not re-published

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
///
/// Must be created inside a tokio runtime: one worker task is spawned per subscriber.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        if ev.kind != EventKind::SubscriberPanicked {
                            worker_bus.publish(Event::subscriber_panicked(
                                name,
                                panic_message(&*payload),
                            ));
                        }
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of attached subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if no subscriber is attached.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.emit_arc(Arc::new(event));
    }

    /// Emits a shared event to all subscribers without cloning it.
    ///
    /// Overflow notices are not re-published when they themselves overflow.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes all queues and waits for the workers to process what is left.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    /// Holds each event until `gate` hands out a permit.
    struct Slow {
        gate: Arc<Semaphore>,
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, event: &Event) {
            self.gate.acquire().await.unwrap().forget();
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "slow"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber exploded");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn events_reach_every_subscriber_in_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], bus);
        assert_eq!(set.len(), 1);

        set.emit(Event::new(EventKind::CallQueued));
        set.emit(Event::new(EventKind::CallStarted));
        set.emit(Event::new(EventKind::CallReturned));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![
                EventKind::CallQueued,
                EventKind::CallStarted,
                EventKind::CallReturned
            ]
        );
    }

    #[tokio::test]
    async fn panicking_subscriber_is_reported_and_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![Arc::new(Exploder), rec.clone()], bus);

        set.emit(Event::new(EventKind::StopRequested));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.name.as_deref(), Some("exploder"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::StopRequested]);
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_subscriber_only() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let gate = Arc::new(Semaphore::new(0));
        let slow = Arc::new(Slow {
            gate: gate.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![slow.clone(), rec.clone()], bus);

        // No await in between: the workers have not run, so `slow` holds one event.
        set.emit(Event::new(EventKind::CallQueued));
        set.emit(Event::new(EventKind::CallStarted));
        set.emit(Event::new(EventKind::CallReturned));
        // An overflow notice that overflows itself is not re-published.
        set.emit(Event::subscriber_overflow("elsewhere", "full"));

        for _ in 0..2 {
            let ev = rx.try_recv().unwrap();
            assert_eq!(ev.kind, EventKind::SubscriberOverflow);
            assert_eq!(ev.name.as_deref(), Some("slow"));
            assert!(ev.reason.as_deref().unwrap().contains("reason=full"));
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        gate.add_permits(8);
        set.shutdown().await;

        assert_eq!(*slow.seen.lock().unwrap(), vec![EventKind::CallQueued]);
        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![
                EventKind::CallQueued,
                EventKind::CallStarted,
                EventKind::CallReturned,
                EventKind::SubscriberOverflow
            ]
        );
    }
}

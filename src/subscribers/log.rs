//! # LogWriter — events as `tracing` records
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`.
//! Install any `tracing` subscriber (e.g. `tracing-subscriber`) to see them.
//!
//! ## Example output
//! ```text
//! INFO  call queued function="add" call_id=3
//! INFO  call started function="add" call_id=3
//! INFO  call returned function="add" call_id=3 elapsed_ms=12
//! WARN  call failed function="divide" call_id=4 elapsed_ms=0 reason="division by zero"
//! WARN  option ignored option="timeout"
//! INFO  drained count=2 elapsed_ms=48
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Renders one of the four call events.
fn log_call(e: &Event) {
    let function = e.name.as_deref().unwrap_or("");
    match e.kind {
        EventKind::CallQueued => {
            tracing::info!(function, call_id = e.call_id, "call queued");
        }
        EventKind::CallStarted => {
            tracing::info!(function, call_id = e.call_id, "call started");
        }
        EventKind::CallReturned => {
            tracing::info!(
                function,
                call_id = e.call_id,
                elapsed_ms = e.elapsed_ms,
                "call returned"
            );
        }
        _ => {
            tracing::warn!(
                function,
                call_id = e.call_id,
                elapsed_ms = e.elapsed_ms,
                reason = e.reason.as_deref().unwrap_or(""),
                "call failed"
            );
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        if e.is_call_event() {
            log_call(e);
            return;
        }

        let name = e.name.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::PendingCleared => {
                tracing::info!(count = e.count, "pending calls cleared");
            }
            EventKind::ConcurrencyChanged => {
                tracing::info!(concurrency = e.concurrency, "concurrency changed");
            }
            EventKind::OptionIgnored => {
                tracing::warn!(option = name, "option ignored");
            }
            EventKind::StopRequested => {
                tracing::info!("stop requested");
            }
            EventKind::Drained => {
                tracing::info!(count = e.count, elapsed_ms = e.elapsed_ms, "drained");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = name, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = name, reason, "subscriber panicked");
            }
            EventKind::CallQueued
            | EventKind::CallStarted
            | EventKind::CallReturned
            | EventKind::CallFailed => {}
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

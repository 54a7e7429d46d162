//! # Executor: turns calls into funnel tasks and result envelopes.
//!
//! ## Call flow
//! ```text
//! call_function(call)
//!   ├─► encode(call)              ── Err ──► CallError::UnsupportedArgument (nothing queued)
//!   ├─► queued = now, publish CallQueued
//!   └─► funnel.push(task) ──► PendingCall
//!
//! task (once admitted):
//!   ├─► start = now, publish CallStarted
//!   ├─► host.execute(call, start)
//!   │       └─ Err(e) ──► host.create_error_response(e, call, start)
//!   ├─► local_end = now, publish CallReturned | CallFailed
//!   └─► ResultEnvelope { returned, queued, sent = start, remote end, local_end }
//! ```
//!
//! ## Rules
//! - A failing target never fails the call: the envelope carries the error as data
//! - `stop` clears pending calls, then awaits the calls executing at that moment
//! - `set_concurrency` only affects future admissions

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Instant, SystemTime};

use crate::call::{FunctionCall, RawResponse, ResultEnvelope, encode};
use crate::config::Options;
use crate::error::CallError;
use crate::events::{Bus, Event, EventKind};
use crate::funnel::{Admission, Funnel, FunnelError};
use crate::host::ExecutionHost;

/// Owns the funnel and the execution host of a ready backend.
pub struct Executor {
    funnel: Funnel<ResultEnvelope>,
    host: Arc<ExecutionHost>,
    options: Options,
    bus: Bus,
}

impl Executor {
    /// Creates an executor whose funnel starts at `options.concurrency` (`0` = unlimited).
    ///
    /// Must be used within a tokio runtime: admitted calls are spawned.
    pub fn new(host: ExecutionHost, options: Options, bus: Bus) -> Self {
        Self {
            funnel: Funnel::new(options.concurrency),
            host: Arc::new(host),
            options,
            bus,
        }
    }

    /// Encodes `call` and schedules it on the funnel.
    ///
    /// # Errors
    /// Fails only when the request cannot be encoded; in that case nothing is queued.
    pub fn call_function(&self, call: &FunctionCall) -> Result<PendingCall, CallError> {
        let canonical = encode(call, self.options.module_path.as_deref())?;
        let call_id = canonical.call_id();
        let queued = SystemTime::now();
        self.bus.publish(
            Event::new(EventKind::CallQueued)
                .with_name(canonical.name())
                .with_call_id(call_id),
        );

        let host = Arc::clone(&self.host);
        let bus = self.bus.clone();
        let admission = self.funnel.push(move || async move {
            let start = SystemTime::now();
            let started = Instant::now();
            bus.publish(
                Event::new(EventKind::CallStarted)
                    .with_name(canonical.name())
                    .with_call_id(call_id),
            );

            let returned = match host.execute(&canonical, start).await {
                Ok(res) => res,
                Err(err) => host.create_error_response(err, &canonical, start),
            };
            let local_end = SystemTime::now();

            let ev = match returned.error() {
                None => Event::new(EventKind::CallReturned),
                Some(details) => {
                    Event::new(EventKind::CallFailed).with_reason(details.message.as_str())
                }
            };
            bus.publish(
                ev.with_name(canonical.name())
                    .with_call_id(call_id)
                    .with_elapsed(started.elapsed()),
            );

            ResultEnvelope {
                remote_response_sent: returned.remote_execution_end,
                returned,
                raw_response: RawResponse::Empty,
                local_request_queued: queued,
                local_request_sent: start,
                local_end,
            }
        });

        Ok(PendingCall { call_id, admission })
    }

    /// Changes the funnel limit (`0` = unlimited). Running calls are not interrupted.
    pub fn set_concurrency(&self, max_concurrency: usize) {
        self.funnel.set_max_concurrency(max_concurrency);
        self.bus
            .publish(Event::new(EventKind::ConcurrencyChanged).with_concurrency(max_concurrency));
    }

    /// Discards pending calls and waits for executing ones. Returns an empty identifier.
    pub async fn stop(&self) -> String {
        self.bus.publish(Event::new(EventKind::StopRequested));
        let t0 = Instant::now();

        let drained = self.funnel.drain().await;
        if drained.cleared > 0 {
            self.bus
                .publish(Event::new(EventKind::PendingCleared).with_count(drained.cleared));
        }
        self.bus.publish(
            Event::new(EventKind::Drained)
                .with_count(drained.awaited)
                .with_elapsed(t0.elapsed()),
        );
        tracing::debug!(
            cleared = drained.cleared,
            awaited = drained.awaited,
            "executor drained"
        );
        String::new()
    }

    /// Same as [`stop`](Self::stop); there are no remote resources to release.
    pub async fn cleanup(&self) {
        self.stop().await;
    }

    pub fn funnel(&self) -> &Funnel<ResultEnvelope> {
        &self.funnel
    }

    pub fn host(&self) -> &ExecutionHost {
        &self.host
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// Future for the [`ResultEnvelope`] of a scheduled call.
///
/// The call runs even if this future is dropped.
#[must_use = "dropping a PendingCall discards the call result"]
pub struct PendingCall {
    call_id: u64,
    admission: Admission<ResultEnvelope>,
}

impl PendingCall {
    /// Id of the canonical call.
    pub fn call_id(&self) -> u64 {
        self.call_id
    }
}

impl Future for PendingCall {
    type Output = Result<ResultEnvelope, CallError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.admission).poll(cx).map(|res| {
            res.map_err(|e| match e {
                FunnelError::Cancelled => CallError::Cancelled,
                FunnelError::Panicked { message } => CallError::Panicked { message },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::host::{Args, FunctionFn, Module};

    fn executor(concurrency: usize) -> Executor {
        let module = Module::new("./fixtures")
            .with_function(FunctionFn::arc("sleep", |args: Args| async move {
                let ms: u64 = args.get(0)?;
                sleep(Duration::from_millis(ms)).await;
                anyhow::Ok(json!(ms))
            }))
            .with_function(FunctionFn::arc("throw", |args: Args| async move {
                let msg: String = args.get(0)?;
                sleep(Duration::from_millis(5)).await;
                Err::<serde_json::Value, _>(anyhow::anyhow!(msg))
            }));
        let options = Options::default().with_concurrency(concurrency);
        Executor::new(ExecutionHost::new(module), options, Bus::new(64))
    }

    #[tokio::test]
    async fn returned_value_is_wrapped_in_envelope() {
        let ex = executor(0);
        let pending = ex.call_function(&FunctionCall::new("sleep").arg(10)).unwrap();
        let call_id = pending.call_id();
        let env = pending.await.unwrap();

        assert_eq!(env.returned.call_id, call_id);
        assert_eq!(env.returned.value(), Some(&json!(10)));
        assert_eq!(env.raw_response, RawResponse::Empty);
        assert_eq!(env.returned.remote_execution_start, env.local_request_sent);
        assert!(env.is_ordered());
        assert!(env.execution_time() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn target_failure_is_data_not_error() {
        let ex = executor(0);
        let env = ex
            .call_function(&FunctionCall::new("throw").arg("expected failure"))
            .unwrap()
            .await
            .unwrap();

        assert!(env.returned.is_error());
        assert_eq!(env.returned.error().unwrap().message, "expected failure");
        assert!(env.local_request_sent <= env.remote_response_sent);
        assert!(env.remote_response_sent <= env.local_end);
    }

    #[tokio::test]
    async fn unknown_function_is_data_not_error() {
        let ex = executor(0);
        let env = ex.call_function(&FunctionCall::new("nope")).unwrap().await.unwrap();
        assert_eq!(env.returned.error().unwrap().name, "host_not_found");
    }

    #[tokio::test]
    async fn unsupported_argument_fails_before_queueing() {
        let ex = executor(1);
        let err = ex
            .call_function(&FunctionCall::new("sleep").arg(f64::NAN))
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "call_unsupported_argument");
        assert_eq!(ex.funnel().pending_len(), 0);
        assert_eq!(ex.funnel().executing_len(), 0);
    }

    #[tokio::test]
    async fn stop_cancels_queued_and_awaits_running() {
        let ex = executor(1);
        let running = ex.call_function(&FunctionCall::new("sleep").arg(40)).unwrap();
        let queued = ex.call_function(&FunctionCall::new("sleep").arg(40)).unwrap();
        let snapshot = ex.funnel().executing();
        assert_eq!(snapshot.len(), 1);

        assert_eq!(ex.stop().await, "");
        assert_eq!(ex.funnel().executing_len(), 0);
        assert!(matches!(queued.await, Err(CallError::Cancelled)));
        assert!(running.await.is_ok());

        // Second stop finds nothing outstanding.
        let t0 = Instant::now();
        ex.stop().await;
        assert!(t0.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn events_follow_call_lifecycle() {
        let ex = executor(0);
        let mut rx = ex.bus.subscribe();
        ex.call_function(&FunctionCall::new("throw").arg("x"))
            .unwrap()
            .await
            .unwrap();
        ex.set_concurrency(3);

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::CallQueued,
                EventKind::CallStarted,
                EventKind::CallFailed,
                EventKind::ConcurrencyChanged
            ]
        );
    }
}

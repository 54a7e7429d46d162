//! # ImmediateBackend: the in-process [`Backend`].
//!
//! Wraps an [`Executor`] in a three-state lifecycle and wires the event bus to
//! the configured subscribers.
//!
//! ## States
//! ```text
//!                initialize()                stop()
//! Uninitialized ─────────────► Ready ───────────────────► Stopped
//!                                │  ▲                      │  ▲
//!            call_function()     │  │ set_concurrency()    │  │ stop() (re-confirms drain)
//!                                └──┘                      └──┘
//!                                                          │
//!                                            cleanup() ────┴──► Stopped (executor released)
//! ```
//!
//! ## Event wiring
//! ```text
//! initialize():
//!   Bus::new(options.bus_capacity)
//!   if subscribers: SubscriberSet::new(subs) + listener task (Bus ─► set.emit)
//!   for each ignored option: tracing::warn! + publish(OptionIgnored)
//!
//! cleanup():
//!   executor.cleanup()  (StopRequested, PendingCleared?, Drained)
//!   listener: cancel token ─► forward what is buffered ─► set.shutdown()
//!             ─► late SubscriberPanicked/Overflow ─► tracing::warn!
//! ```
//!
//! ## Rules
//! - `call_function` and `set_concurrency` require Ready
//! - `stop` and `cleanup` never fail; on an uninitialized backend they do nothing
//! - Lifecycle locks are never held across an `.await`
//! - A call accepted by `call_function` is always pushed before `stop` drains

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::BackendBuilder;
use super::executor::{Executor, PendingCall};
use crate::call::FunctionCall;
use crate::config::Options;
use crate::error::CallError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{ExecutionHost, Module};
use crate::provider::{Backend, Logger, PackResult};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Provider name reported by [`ImmediateBackend`].
pub const IMMEDIATE: &str = "immediate";

/// Observable lifecycle state of an [`ImmediateBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    Ready,
    Stopped,
}

impl BackendState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Uninitialized => "uninitialized",
            BackendState::Ready => "ready",
            BackendState::Stopped => "stopped",
        }
    }
}

enum Phase {
    Uninitialized,
    Ready(Arc<Executor>),
    /// `None` once `cleanup` released the executor.
    Stopped(Option<Arc<Executor>>),
}

impl Phase {
    fn state(&self) -> BackendState {
        match self {
            Phase::Uninitialized => BackendState::Uninitialized,
            Phase::Ready(_) => BackendState::Ready,
            Phase::Stopped(_) => BackendState::Stopped,
        }
    }

    fn executor(&self) -> Option<Arc<Executor>> {
        match self {
            Phase::Ready(ex) | Phase::Stopped(Some(ex)) => Some(Arc::clone(ex)),
            Phase::Uninitialized | Phase::Stopped(None) => None,
        }
    }
}

/// Task forwarding bus events to the subscriber set.
struct Listener {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Listener {
    fn spawn(subscribers: Vec<Arc<dyn Subscribe>>, bus: &Bus) -> Self {
        let set = SubscriberSet::new(subscribers, bus.clone());
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let stop = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    () = stop.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;

            // Workers finishing the backlog can still report faults; nobody is
            // left to forward them, so they go to the log instead.
            loop {
                match rx.try_recv() {
                    Ok(ev) if ev.is_subscriber_fault() => {
                        tracing::warn!(
                            kind = ?ev.kind,
                            subscriber = ev.name.as_deref().unwrap_or(""),
                            reason = ev.reason.as_deref().unwrap_or(""),
                            "subscriber fault after event delivery stopped"
                        );
                    }
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        });
        Self { token, handle }
    }

    /// Forwards buffered events, then waits for every subscriber to process them.
    async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

/// Backend that executes calls in the current process.
///
/// Create with [`ImmediateBackend::new`] or [`ImmediateBackend::builder`], then drive
/// it through the [`Backend`] trait.
pub struct ImmediateBackend {
    phase: RwLock<Phase>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    listener: Mutex<Option<Listener>>,
}

impl ImmediateBackend {
    /// Creates an uninitialized backend without subscribers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for attaching subscribers.
    pub fn builder() -> BackendBuilder {
        BackendBuilder::new()
    }

    pub(crate) fn from_parts(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            phase: RwLock::new(Phase::Uninitialized),
            subscribers,
            listener: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BackendState {
        self.read().state()
    }

    /// The executor, from `initialize` until `cleanup`.
    pub fn executor(&self) -> Option<Arc<Executor>> {
        self.read().executor()
    }

    fn start(&self, module: Module, options: Options) -> Result<(), CallError> {
        let mut phase = self.write();
        if !matches!(*phase, Phase::Uninitialized) {
            return Err(CallError::InvalidState {
                operation: "initialize",
                state: phase.state().as_str(),
            });
        }

        let bus = Bus::new(options.bus_capacity_clamped());
        if !self.subscribers.is_empty() {
            *self.lock_listener() = Some(Listener::spawn(self.subscribers.clone(), &bus));
        }
        for option in options.ignored_options() {
            tracing::warn!("{IMMEDIATE} backend does not support {option} option, ignoring");
            bus.publish(Event::new(EventKind::OptionIgnored).with_name(option));
        }

        tracing::debug!(
            module = module.specifier(),
            functions = module.len(),
            concurrency = options.concurrency,
            "{IMMEDIATE} backend ready"
        );
        let executor = Executor::new(ExecutionHost::new(module), options, bus);
        *phase = Phase::Ready(Arc::new(executor));
        Ok(())
    }

    fn ready(&self, operation: &'static str) -> Result<Arc<Executor>, CallError> {
        match &*self.read() {
            Phase::Ready(ex) => Ok(Arc::clone(ex)),
            other => Err(CallError::InvalidState {
                operation,
                state: other.state().as_str(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Phase> {
        self.phase.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Phase> {
        self.phase.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ImmediateBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ImmediateBackend {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.token.cancel();
        }
    }
}

#[async_trait]
impl Backend for ImmediateBackend {
    fn name(&self) -> &'static str {
        IMMEDIATE
    }

    async fn initialize(&self, module: Module, options: Options) -> Result<(), CallError> {
        self.start(module, options)
    }

    /// There is nothing to deploy in-process.
    async fn pack(
        &self,
        _module_specifier: &str,
        _options: &Options,
    ) -> Result<PackResult, CallError> {
        Err(CallError::UnsupportedOperation {
            operation: "pack",
            backend: IMMEDIATE,
        })
    }

    async fn cleanup_resources(&self, _resources: &str) -> Result<(), CallError> {
        Ok(())
    }

    fn call_function(&self, call: &FunctionCall) -> Result<PendingCall, CallError> {
        // The read guard spans the push, so `stop` cannot drain in between.
        match &*self.read() {
            Phase::Ready(ex) => ex.call_function(call),
            other => Err(CallError::InvalidState {
                operation: "call_function",
                state: other.state().as_str(),
            }),
        }
    }

    async fn set_concurrency(&self, max_concurrency: usize) -> Result<(), CallError> {
        self.ready("set_concurrency")?.set_concurrency(max_concurrency);
        Ok(())
    }

    async fn stop(&self) -> Result<String, CallError> {
        let executor = {
            let mut phase = self.write();
            let current = phase.executor();
            if matches!(*phase, Phase::Ready(_)) {
                *phase = Phase::Stopped(current.clone());
            }
            current
        };
        match executor {
            Some(ex) => Ok(ex.stop().await),
            None => Ok(String::new()),
        }
    }

    async fn cleanup(&self) -> Result<(), CallError> {
        let executor = {
            let mut phase = self.write();
            let current = phase.executor();
            if !matches!(*phase, Phase::Uninitialized) {
                *phase = Phase::Stopped(None);
            }
            current
        };
        if let Some(ex) = executor {
            ex.cleanup().await;
        }

        let listener = self.lock_listener().take();
        if let Some(listener) = listener {
            listener.shutdown().await;
        }
        Ok(())
    }

    /// Diagnostics go through `tracing`; the sink is accepted and not used.
    fn set_logger(&self, _logger: Option<Logger>) {}
}

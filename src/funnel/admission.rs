use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

use super::error::FunnelError;

/// Cloneable future that completes when one admitted task has settled.
///
/// Returned in bulk by [`Funnel::executing`](super::Funnel::executing).
pub type Completion = Shared<BoxFuture<'static, ()>>;

/// Future for the outcome of a pushed task.
///
/// The task runs whether or not this future is polled; dropping it only
/// discards the result.
#[must_use = "dropping an Admission discards the task result"]
pub struct Admission<T> {
    rx: oneshot::Receiver<Result<T, FunnelError>>,
}

impl<T> Admission<T> {
    pub(super) fn new(rx: oneshot::Receiver<Result<T, FunnelError>>) -> Self {
        Self { rx }
    }
}

impl<T> Future for Admission<T> {
    type Output = Result<T, FunnelError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the task was discarded without a verdict.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(FunnelError::Cancelled)))
    }
}

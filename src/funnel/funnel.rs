use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::sync::oneshot;

use super::admission::{Admission, Completion};
use super::error::FunnelError;
use crate::error::panic_message;

type Job<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// A task that has been pushed but not started.
struct Deferred<T> {
    id: u64,
    job: Job<T>,
    result: oneshot::Sender<Result<T, FunnelError>>,
}

/// A task moved from `pending` to `executing`, ready to be spawned.
struct Started<T> {
    deferred: Deferred<T>,
    done: oneshot::Sender<()>,
}

struct State<T> {
    /// `0` = unlimited.
    max_concurrency: usize,
    pending: VecDeque<Deferred<T>>,
    /// Keyed by push order.
    executing: BTreeMap<u64, Completion>,
    next_id: u64,
}

impl<T> State<T> {
    fn has_capacity(&self) -> bool {
        self.max_concurrency == 0 || self.executing.len() < self.max_concurrency
    }

    /// Moves pending tasks to `executing` while capacity allows, in FIFO order.
    fn admit(&mut self) -> Vec<Started<T>> {
        let mut started = Vec::new();
        while self.has_capacity() {
            let Some(deferred) = self.pending.pop_front() else {
                break;
            };
            let (done, done_rx) = oneshot::channel::<()>();
            let completion: Completion = done_rx.map(|_| ()).boxed().shared();
            self.executing.insert(deferred.id, completion);
            started.push(Started { deferred, done });
        }
        started
    }
}

/// Bounded concurrency funnel.
///
/// Cloning yields another handle to the same queue.
pub struct Funnel<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Funnel<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

/// What [`Funnel::drain`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    /// Pending tasks discarded.
    pub cleared: usize,
    /// Executing tasks awaited.
    pub awaited: usize,
}

impl<T: Send + 'static> Funnel<T> {
    /// Creates a funnel admitting at most `max_concurrency` tasks at once (`0` = unlimited).
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                max_concurrency,
                pending: VecDeque::new(),
                executing: BTreeMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Creates a funnel without a concurrency limit.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Pushes a task.
    ///
    /// The task starts right away if fewer than `max_concurrency` tasks are executing,
    /// otherwise it waits in FIFO order. Must be called within a tokio runtime.
    pub fn push<F, Fut>(&self, task: F) -> Admission<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (result, rx) = oneshot::channel();
        let job: Job<T> = Box::new(move || task().boxed());

        let started = {
            let mut st = self.lock();
            let id = st.next_id;
            st.next_id += 1;
            st.pending.push_back(Deferred { id, job, result });
            st.admit()
        };
        self.spawn_all(started);
        Admission::new(rx)
    }

    /// Updates the limit (`0` = unlimited).
    ///
    /// Raising the limit starts waiting tasks immediately; lowering it never
    /// interrupts tasks that are already running.
    pub fn set_max_concurrency(&self, max_concurrency: usize) {
        let started = {
            let mut st = self.lock();
            st.max_concurrency = max_concurrency;
            st.admit()
        };
        tracing::debug!(max_concurrency, admitted = started.len(), "funnel limit changed");
        self.spawn_all(started);
    }

    /// Discards every task that has not started; their admissions resolve to
    /// [`FunnelError::Cancelled`]. Returns how many were discarded.
    pub fn clear_pending(&self) -> usize {
        let cleared: Vec<Deferred<T>> = self.lock().pending.drain(..).collect();
        let n = cleared.len();
        for d in cleared {
            let _ = d.result.send(Err(FunnelError::Cancelled));
        }
        if n > 0 {
            tracing::debug!(cleared = n, "funnel pending cleared");
        }
        n
    }

    /// Point-in-time snapshot of completions for tasks admitted and not yet settled.
    pub fn executing(&self) -> Vec<Completion> {
        self.lock().executing.values().cloned().collect()
    }

    /// Clears pending tasks, then waits for every task executing at that moment.
    ///
    /// Tasks pushed while draining are not awaited.
    pub async fn drain(&self) -> Drained {
        let cleared = self.clear_pending();
        let executing = self.executing();
        let awaited = executing.len();
        join_all(executing).await;
        Drained { cleared, awaited }
    }

    /// Current limit (`0` = unlimited).
    pub fn max_concurrency(&self) -> usize {
        self.lock().max_concurrency
    }

    /// Number of tasks waiting for admission.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of tasks admitted and not yet settled.
    pub fn executing_len(&self) -> usize {
        self.lock().executing.len()
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Critical sections never run user code, so a poisoned lock still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_all(&self, started: Vec<Started<T>>) {
        for s in started {
            tokio::spawn(self.clone().run(s));
        }
    }

    async fn run(self, started: Started<T>) {
        let Started {
            deferred: Deferred { id, job, result },
            done,
        } = started;

        let outcome = AssertUnwindSafe(async move { job().await })
            .catch_unwind()
            .await
            .map_err(|payload| FunnelError::Panicked {
                message: panic_message(&*payload),
            });
        // Leave `executing` before the caller can observe the result.
        let next = {
            let mut st = self.lock();
            st.executing.remove(&id);
            st.admit()
        };
        let _ = result.send(outcome);
        drop(done);
        tracing::trace!(task = id, admitted = next.len(), "funnel task settled");
        self.spawn_all(next);
    }
}

impl<T: Send + 'static> Default for Funnel<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use tokio::sync::Semaphore;
    use tokio::time::sleep;

    use super::*;

    /// Lets spawned tasks run until they block again.
    async fn settle() {
        sleep(Duration::from_millis(20)).await;
    }

    /// Task that waits for one permit from `gate`, then returns `value`.
    fn gated<V: Send + 'static>(
        gate: &Arc<Semaphore>,
        value: V,
    ) -> impl FnOnce() -> BoxFuture<'static, V> + Send + 'static {
        let gate = Arc::clone(gate);
        move || {
            async move {
                gate.acquire().await.unwrap().forget();
                value
            }
            .boxed()
        }
    }

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn peak_concurrency_respects_limit() {
        let funnel = Funnel::new(2);
        let gauge = Arc::new(Gauge::default());
        let t0 = Instant::now();

        let admissions: Vec<_> = (0..5)
            .map(|i| {
                let gauge = gauge.clone();
                funnel.push(move || async move {
                    gauge.enter();
                    sleep(Duration::from_millis(50)).await;
                    gauge.leave();
                    i
                })
            })
            .collect();
        assert_eq!(funnel.executing_len(), 2);
        assert_eq!(funnel.pending_len(), 3);

        let results: Vec<_> = join_all(admissions).await.into_iter().map(Result::unwrap).collect();
        let elapsed = t0.elapsed();

        assert_eq!(results, vec![0, 1, 2, 3, 4]);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        assert!(elapsed >= Duration::from_millis(150), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
    }

    #[tokio::test]
    async fn queued_tasks_start_in_fifo_order() {
        let funnel = Funnel::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let admissions: Vec<_> = (0..4)
            .map(|i| {
                let order = order.clone();
                funnel.push(move || async move {
                    order.lock().unwrap().push(i);
                    sleep(Duration::from_millis(5)).await;
                })
            })
            .collect();
        join_all(admissions).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn failure_and_panic_stay_inside_their_task() {
        let funnel: Funnel<Result<u8, String>> = Funnel::new(1);

        let bad = funnel.push(|| async { Err("nope".to_string()) });
        let boom = funnel.push(|| async {
            if true {
                panic!("task blew up");
            }
            Ok(0)
        });
        let good = funnel.push(|| async { Ok(7) });

        assert_eq!(bad.await, Ok(Err("nope".to_string())));
        assert_eq!(
            boom.await,
            Err(FunnelError::Panicked {
                message: "task blew up".into()
            })
        );
        assert_eq!(good.await, Ok(Ok(7)));
        assert_eq!(funnel.executing_len(), 0);
    }

    #[tokio::test]
    async fn clear_pending_cancels_only_queued_tasks() {
        let funnel = Funnel::new(1);
        let gate = Arc::new(Semaphore::new(0));

        let running = funnel.push(gated(&gate, "first"));
        let queued_a = funnel.push(gated(&gate, "second"));
        let queued_b = funnel.push(gated(&gate, "third"));
        settle().await;

        assert_eq!(funnel.clear_pending(), 2);
        assert_eq!(funnel.pending_len(), 0);
        assert_eq!(funnel.executing().len(), 1);

        assert_eq!(queued_a.await, Err(FunnelError::Cancelled));
        assert_eq!(queued_b.await, Err(FunnelError::Cancelled));

        gate.add_permits(1);
        assert_eq!(running.await, Ok("first"));
        assert_eq!(funnel.executing_len(), 0);
    }

    #[tokio::test]
    async fn executing_is_a_snapshot() {
        let funnel = Funnel::unbounded();
        let gate = Arc::new(Semaphore::new(0));

        let _a = funnel.push(gated(&gate, 1));
        let snapshot = funnel.executing();
        let _b = funnel.push(gated(&gate, 2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(funnel.executing_len(), 2);
        gate.add_permits(2);
        join_all(snapshot).await;
    }

    #[tokio::test]
    async fn tightening_does_not_preempt() {
        let funnel = Funnel::new(3);
        let gate = Arc::new(Semaphore::new(0));

        let first: Vec<_> = (0..3).map(|i| funnel.push(gated(&gate, i))).collect();
        funnel.set_max_concurrency(1);
        let late = funnel.push(gated(&gate, 9));
        settle().await;

        assert_eq!(funnel.executing_len(), 3);
        assert_eq!(funnel.pending_len(), 1);

        gate.add_permits(2);
        settle().await;
        // Two finished, one still running: at the limit, so the late task waits.
        assert_eq!(funnel.executing_len(), 1);
        assert_eq!(funnel.pending_len(), 1);

        gate.add_permits(2);
        join_all(first).await;
        assert_eq!(late.await, Ok(9));
    }

    #[tokio::test]
    async fn loosening_admits_waiting_and_new_tasks() {
        let funnel = Funnel::new(2);
        let gate = Arc::new(Semaphore::new(0));

        let mut admissions: Vec<_> = (0..4).map(|i| funnel.push(gated(&gate, i))).collect();
        assert_eq!(funnel.executing_len(), 2);

        funnel.set_max_concurrency(0);
        assert_eq!(funnel.executing_len(), 4);
        assert_eq!(funnel.max_concurrency(), 0);

        admissions.extend((4..7).map(|i| funnel.push(gated(&gate, i))));
        assert_eq!(funnel.executing_len(), 7);
        assert_eq!(funnel.pending_len(), 0);

        gate.add_permits(7);
        let values: Vec<_> = join_all(admissions).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(values.len(), 7);
    }

    #[tokio::test]
    async fn drain_waits_for_everything_that_was_running() {
        let funnel = Funnel::new(2);
        let finished = Arc::new(AtomicUsize::new(0));

        let _admissions: Vec<_> = (0..4)
            .map(|_| {
                let finished = finished.clone();
                funnel.push(move || async move {
                    sleep(Duration::from_millis(30)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        let report = funnel.drain().await;
        assert_eq!(report, Drained { cleared: 2, awaited: 2 });
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(funnel.executing_len(), 0);

        assert_eq!(funnel.drain().await, Drained::default());
    }

    #[tokio::test]
    async fn dropped_admission_does_not_stop_the_task() {
        let funnel = Funnel::unbounded();
        let finished = Arc::new(AtomicUsize::new(0));
        let f = finished.clone();
        drop(funnel.push(move || async move {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        funnel.drain().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn settled_task_is_no_longer_executing() {
        let funnel = Funnel::new(1);
        for i in 0..500u32 {
            assert_eq!(funnel.push(move || async move { i }).await, Ok(i));
            assert_eq!(funnel.executing_len(), 0, "iteration {i}");
            assert!(funnel.executing().is_empty());

            // The slot is free again, so the next push starts right away.
            let next = funnel.push(move || async move { i + 1 });
            assert_eq!(funnel.pending_len(), 0, "iteration {i}");
            assert_eq!(next.await, Ok(i + 1));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn limit_holds_on_a_multi_threaded_runtime() {
        let funnel = Funnel::new(3);
        let gauge = Arc::new(Gauge::default());

        let admissions: Vec<_> = (0..24)
            .map(|_| {
                let gauge = gauge.clone();
                funnel.push(move || async move {
                    gauge.enter();
                    sleep(Duration::from_millis(5)).await;
                    gauge.leave();
                })
            })
            .collect();
        join_all(admissions).await;

        assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
    }
}

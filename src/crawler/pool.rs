//! Bounded worker pool with a self-managed lifecycle
//!
//! This module handles:
//! - Running one task per submitted URL under a global concurrency cap
//! - Streaming results to a single shared stream in completion order
//! - Batch accounting, so the pool knows when all admitted work is done
//! - The `Running -> Draining -> Terminated` lifecycle, driven by explicit
//!   stops, a total run timeout and an idle timeout

use crate::crawler::cancel::CancelSource;
use crate::crawler::task::batch_id;
use crate::crawler::{ResultStatus, Task, TaskHandler, TaskResult};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::state::PoolState;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify, Semaphore};
use tokio::time::{sleep_until, Instant};

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of handler calls running at once
    ///
    /// `0` is accepted and means no token is ever available: admitted tasks
    /// wait until the run is cancelled and nothing executes. It is NOT
    /// "unlimited".
    pub concurrency: usize,

    /// Budget for the whole run, measured from pool creation. Expiry acts
    /// like [`WorkerPool::shutdown`]. `None` means unbounded.
    pub total_timeout: Option<Duration>,

    /// How long the pool may sit with no outstanding batch before it starts
    /// draining. `None` disables the idle timer.
    pub idle_timeout: Option<Duration>,

    /// Buffer size of the result stream; defaults to `max(concurrency, 1)`
    pub stream_capacity: Option<usize>,
}

impl PoolConfig {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            total_timeout: None,
            idle_timeout: None,
            stream_capacity: None,
        }
    }

    /// Sets the total run budget; a zero duration means unbounded
    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = Some(capacity);
        self
    }

    fn channel_capacity(&self) -> usize {
        self.stream_capacity.unwrap_or(self.concurrency).max(1)
    }
}

/// Handle to a pool's single shared result stream
///
/// Every call to [`WorkerPool::submit_tasks`] on the same pool returns a
/// handle to the same stream. The stream ends (`next` returns `None`) once
/// the pool is terminated and every published result has been received.
#[derive(Clone)]
pub struct ResultStream {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<TaskResult>>>,
}

impl ResultStream {
    fn new(rx: mpsc::Receiver<TaskResult>) -> Self {
        Self {
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }

    /// Receives the next result, or `None` once the stream is closed
    ///
    /// Cancel safe: dropping the future never loses a result.
    pub async fn next(&self) -> Option<TaskResult> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Receives every remaining result until the stream closes
    pub async fn collect(&self) -> Vec<TaskResult> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }

    /// Returns true if both handles read from the same stream
    pub fn is_same(&self, other: &ResultStream) -> bool {
        Arc::ptr_eq(&self.rx, &other.rx)
    }
}

impl fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream").finish_non_exhaustive()
    }
}

/// Pool internals shared by the handle, the units and the supervisor
struct Core {
    config: PoolConfig,
    tokens: Semaphore,
    lifecycle: Mutex<Lifecycle>,
    state_tx: watch::Sender<PoolState>,
    cancel: CancelSource,
    wake: Notify,
    stream: ResultStream,
    metrics: Arc<dyn MetricsSink>,
    started: Instant,
}

/// Mutable lifecycle record; the single authority for state transitions
struct Lifecycle {
    state: PoolState,
    outstanding: usize,
    idle_since: Instant,
    /// Present until the pool terminates; dropping it closes the stream
    results_tx: Option<mpsc::Sender<TaskResult>>,
}

/// Per-batch completion counter
struct Batch {
    id: String,
    remaining: AtomicUsize,
}

/// Marks one unit of a batch as finished when dropped, panics included
struct BatchGuard {
    core: Arc<Core>,
    batch: Arc<Batch>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if self.batch.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.core.batch_finished(&self.batch.id);
        }
    }
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> PoolState {
        self.lock().state
    }

    fn batch_finished(&self, id: &str) {
        let mut lifecycle = self.lock();
        lifecycle.outstanding = lifecycle.outstanding.saturating_sub(1);
        if lifecycle.outstanding == 0 {
            lifecycle.idle_since = Instant::now();
        }
        let outstanding = lifecycle.outstanding;
        drop(lifecycle);

        tracing::debug!("Batch {} complete, {} outstanding", id, outstanding);
        self.wake.notify_one();
    }

    /// Moves `Running -> Draining`; returns false if already past Running
    fn begin_draining(&self, reason: &str) -> bool {
        self.drain_if(reason, |_| true)
    }

    /// Idle-timer drain. The timer may fire in the same instant a batch is
    /// admitted, so idleness is re-checked under the lock before draining.
    fn drain_if_idle(&self, idle: Duration) -> bool {
        self.drain_if("idle timeout reached", |lifecycle| {
            lifecycle.outstanding == 0 && lifecycle.idle_since + idle <= Instant::now()
        })
    }

    fn drain_if(&self, reason: &str, ready: impl FnOnce(&Lifecycle) -> bool) -> bool {
        let mut lifecycle = self.lock();
        if !lifecycle.state.can_transition_to(PoolState::Draining) || !ready(&lifecycle) {
            return false;
        }
        lifecycle.state = PoolState::Draining;
        // published under the lock so watchers never see states out of order
        self.state_tx.send_replace(PoolState::Draining);
        drop(lifecycle);

        tracing::info!("Pool draining ({}), no new tasks admitted", reason);
        self.wake.notify_one();
        true
    }

    fn cancel_all(&self, reason: &str) {
        self.begin_draining(reason);
        if self.cancel.cancel() {
            tracing::info!("Cancelling in-flight tasks ({})", reason);
        }
        self.wake.notify_one();
    }

    /// Moves `Draining -> Terminated` once nothing is outstanding
    fn try_terminate(&self) -> bool {
        let sender = {
            let mut lifecycle = self.lock();
            if lifecycle.state != PoolState::Draining || lifecycle.outstanding > 0 {
                return false;
            }
            lifecycle.state = PoolState::Terminated;
            self.state_tx.send_replace(PoolState::Terminated);
            lifecycle.results_tx.take()
        };

        // units hold their own sender clones; the stream closes after the last one
        drop(sender);
        self.tokens.close();
        tracing::info!("Pool terminated after {:?}", self.started.elapsed());
        true
    }
}

/// Executes URLs through a [`TaskHandler`] with bounded parallelism
///
/// The pool must be created inside a tokio runtime: construction spawns the
/// supervisor task that drives timer-based lifecycle transitions. A pool
/// that has neither timeout configured lives until [`WorkerPool::shutdown`]
/// or [`WorkerPool::graceful_shutdown`] is called.
///
/// # Example
///
/// ```no_run
/// use sumi_walk::crawler::{Body, CancelSignal, PoolConfig, Task, TaskResult, WorkerPool};
/// use std::time::Duration;
///
/// # async fn example() {
/// let handler = |task: Task, _cancel: CancelSignal| async move {
///     TaskResult::ok(task, 200, Body::from_text("<html></html>"))
/// };
/// let config = PoolConfig::new(4).with_idle_timeout(Duration::from_millis(100));
/// let pool = WorkerPool::new(handler, config);
///
/// let stream = pool.submit_tasks(["https://example.com/"]);
/// while let Some(result) = stream.next().await {
///     println!("{} -> {}", result.task, result.status);
/// }
/// # }
/// ```
pub struct WorkerPool<H> {
    core: Arc<Core>,
    handler: Arc<H>,
}

impl<H> Clone for WorkerPool<H> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: TaskHandler> WorkerPool<H> {
    /// Creates a pool without metrics
    pub fn new(handler: H, config: PoolConfig) -> Self {
        Self::with_metrics(handler, config, Arc::new(NoopMetrics))
    }

    /// Creates a pool that reports its counters to `metrics`
    pub fn with_metrics(handler: H, config: PoolConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        let (results_tx, results_rx) = mpsc::channel(config.channel_capacity());
        let (state_tx, _state_rx) = watch::channel(PoolState::Running);
        let started = Instant::now();

        let permits = config.concurrency.min(Semaphore::MAX_PERMITS);
        if permits == 0 {
            tracing::warn!("Pool created with concurrency 0: no task will ever execute");
        }

        tracing::info!(
            "Starting pool: concurrency={}, total_timeout={:?}, idle_timeout={:?}",
            permits,
            config.total_timeout,
            config.idle_timeout
        );

        let core = Arc::new(Core {
            tokens: Semaphore::new(permits),
            lifecycle: Mutex::new(Lifecycle {
                state: PoolState::Running,
                outstanding: 0,
                idle_since: started,
                results_tx: Some(results_tx),
            }),
            state_tx,
            cancel: CancelSource::new(),
            wake: Notify::new(),
            stream: ResultStream::new(results_rx),
            metrics,
            started,
            config,
        });

        tokio::spawn(supervise(Arc::clone(&core)));

        Self {
            core,
            handler: Arc::new(handler),
        }
    }

    /// Submits a batch of URLs and returns the pool's shared result stream
    ///
    /// - An empty batch returns immediately with no side effects.
    /// - While the pool is `Draining` or `Terminated` nothing executes; the
    ///   batch is counted as skipped and the same stream is returned.
    /// - Otherwise one task is spawned per URL. Each waits for a concurrency
    ///   token, runs the handler, releases the token, then publishes its
    ///   result.
    pub fn submit_tasks<I, T>(&self, urls: I) -> ResultStream
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        let tasks: Vec<Task> = urls.into_iter().map(Into::into).collect();
        if tasks.is_empty() {
            return self.results();
        }

        let admitted = {
            let mut lifecycle = self.core.lock();
            match (lifecycle.state, lifecycle.results_tx.clone()) {
                (PoolState::Running, Some(sender)) => {
                    lifecycle.outstanding += 1;
                    Ok(sender)
                }
                (state, _) => Err(state),
            }
        };

        let sender = match admitted {
            Ok(sender) => sender,
            Err(state) => {
                if state.is_terminal() {
                    tracing::warn!(
                        "Submit after pool terminated, {} tasks dropped",
                        tasks.len()
                    );
                } else {
                    tracing::debug!("Pool {}, {} tasks skipped", state, tasks.len());
                }
                self.core.metrics.inc_skipped(tasks.len());
                return self.results();
            }
        };
        self.core.wake.notify_one();

        let batch = Arc::new(Batch {
            id: batch_id(&tasks),
            remaining: AtomicUsize::new(tasks.len()),
        });
        tracing::debug!("Submitted batch {} with {} tasks", batch.id, tasks.len());

        for (index, task) in tasks.into_iter().enumerate() {
            self.core.metrics.inc_submitted();
            let guard = BatchGuard {
                core: Arc::clone(&self.core),
                batch: Arc::clone(&batch),
            };
            tokio::spawn(run_unit(
                Arc::clone(&self.core),
                Arc::clone(&self.handler),
                task,
                index,
                sender.clone(),
                guard,
            ));
        }

        self.results()
    }
}

impl<H> WorkerPool<H> {
    /// The shared result stream, without submitting anything
    pub fn results(&self) -> ResultStream {
        self.core.stream.clone()
    }

    pub fn state(&self) -> PoolState {
        self.core.state()
    }

    /// Watches lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<PoolState> {
        self.core.state_tx.subscribe()
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.core.metrics
    }

    /// Stops admitting new batches; already admitted tasks still run
    pub fn graceful_shutdown(&self) {
        self.core.begin_draining("graceful shutdown");
    }

    /// Stops admitting new batches and cancels in-flight work
    pub fn shutdown(&self) {
        self.core.cancel_all("shutdown");
    }

    /// Completes once the pool has terminated and closed its stream
    pub async fn wait_terminated(&self) {
        let mut rx = self.core.state_tx.subscribe();
        // the sender lives in `core`, which `self` keeps alive
        let _ = rx.wait_for(|state| state.is_terminal()).await;
    }
}

impl<H> fmt::Debug for WorkerPool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.core.config)
            .field("state", &self.core.state())
            .finish_non_exhaustive()
    }
}

/// One task's life: acquire, handle, release, publish
async fn run_unit<H: TaskHandler>(
    core: Arc<Core>,
    handler: Arc<H>,
    task: Task,
    index: usize,
    results: mpsc::Sender<TaskResult>,
    _guard: BatchGuard,
) {
    let cancel = core.cancel.signal();

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("th {}: cancelled before start for task {}", index, task);
            return;
        }
        permit = core.tokens.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("th {}: token pool closed for task {}", index, task);
                return;
            }
        },
    };

    let result = handler.handle(task.clone(), cancel.clone()).await;
    drop(permit);

    core.metrics.inc_processed();
    if result.status == ResultStatus::Cancelled {
        core.metrics.inc_timed_out();
    }
    tracing::debug!("th {}: {} for task {}", index, result.status, task);

    tokio::select! {
        biased;
        sent = results.send(result) => {
            if sent.is_err() {
                tracing::debug!("th {}: stream closed, result for {} dropped", index, task);
            }
        }
        _ = cancel.cancelled() => {
            tracing::debug!("th {}: cancelled while publishing task {}", index, task);
        }
    }
}

/// Drives timer-based transitions and termination
async fn supervise(core: Arc<Core>) {
    let deadline = core.config.total_timeout.map(|timeout| core.started + timeout);

    loop {
        let (state, outstanding, idle_since) = {
            let lifecycle = core.lock();
            (lifecycle.state, lifecycle.outstanding, lifecycle.idle_since)
        };

        match state {
            PoolState::Terminated => break,
            PoolState::Draining if outstanding == 0 && core.try_terminate() => break,
            _ => {}
        }

        let hard_deadline = deadline.filter(|_| !core.cancel.is_cancelled());
        let idle_deadline = match core.config.idle_timeout {
            Some(idle) if state.accepts_work() && outstanding == 0 => Some(idle_since + idle),
            _ => None,
        };

        tokio::select! {
            _ = core.wake.notified() => {}
            _ = sleep_until_some(hard_deadline) => core.cancel_all("total timeout reached"),
            _ = sleep_until_some(idle_deadline) => {
                if let Some(idle) = core.config.idle_timeout {
                    core.drain_if_idle(idle);
                }
            }
        }
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

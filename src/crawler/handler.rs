//! The seam between the worker pool and whatever performs a fetch

use crate::crawler::{CancelSignal, Task, TaskResult};
use async_trait::async_trait;
use std::future::Future;

/// Performs one task and reports its outcome
///
/// Implementations never fail: transport problems become
/// `ResultStatus::Fail` results and cancellation becomes
/// `ResultStatus::Cancelled`. Long-running work should watch `cancel`.
///
/// Any `Fn(Task, CancelSignal) -> impl Future<Output = TaskResult>` closure
/// is a handler as well.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: Task, cancel: CancelSignal) -> TaskResult;
}

#[async_trait]
impl<F, Fut> TaskHandler for F
where
    F: Fn(Task, CancelSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    async fn handle(&self, task: Task, cancel: CancelSignal) -> TaskResult {
        (self)(task, cancel).await
    }
}

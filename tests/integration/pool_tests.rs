//! Worker pool lifecycle and scheduling tests

use crate::{sleepy_handler, urls, CallStats};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use sumi_walk::crawler::{PoolConfig, ResultStatus, WorkerPool};
use sumi_walk::metrics::CrawlMetrics;
use sumi_walk::PoolState;
use tokio::time::Instant;

const LATENCY: Duration = Duration::from_millis(100);

fn millis(d: Duration) -> u128 {
    d.as_millis()
}

#[tokio::test(start_paused = true)]
async fn test_single_worker_runs_tasks_one_at_a_time() {
    let stats = Arc::new(CallStats::default());
    let pool = WorkerPool::new(sleepy_handler(LATENCY, stats.clone()), PoolConfig::new(1));
    let started = Instant::now();

    let stream = pool.submit_tasks(urls("a", 3));
    pool.graceful_shutdown();
    let results = stream.collect().await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.status == ResultStatus::Ok));
    let elapsed = millis(started.elapsed());
    assert!((300..310).contains(&elapsed), "elapsed {}ms", elapsed);
    assert_eq!(stats.max_active(), 1);
    assert_eq!(pool.state(), PoolState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_two_workers_halve_the_wall_time() {
    let stats = Arc::new(CallStats::default());
    let pool = WorkerPool::new(sleepy_handler(LATENCY, stats.clone()), PoolConfig::new(2));
    let started = Instant::now();

    let stream = pool.submit_tasks(urls("a", 3));
    pool.graceful_shutdown();
    let results = stream.collect().await;

    assert_eq!(results.len(), 3);
    let elapsed = millis(started.elapsed());
    assert!((200..210).contains(&elapsed), "elapsed {}ms", elapsed);
    assert_eq!(stats.max_active(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_total_timeout_cancels_in_flight_task() {
    let stats = Arc::new(CallStats::default());
    let metrics = Arc::new(CrawlMetrics::new());
    let config = PoolConfig::new(1).with_total_timeout(Duration::from_millis(150));
    let pool =
        WorkerPool::with_metrics(sleepy_handler(LATENCY, stats.clone()), config, metrics.clone());
    let started = Instant::now();

    let results = pool.submit_tasks(urls("a", 2)).collect().await;

    let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![ResultStatus::Ok, ResultStatus::Cancelled]);
    let elapsed = millis(started.elapsed());
    assert!((150..160).contains(&elapsed), "elapsed {}ms", elapsed);
    assert_eq!(pool.state(), PoolState::Terminated);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 2);
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.timed_out, 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_concurrency_never_runs_handler() {
    let stats = Arc::new(CallStats::default());
    let metrics = Arc::new(CrawlMetrics::new());
    let pool = WorkerPool::with_metrics(
        sleepy_handler(LATENCY, stats.clone()),
        PoolConfig::new(0),
        metrics.clone(),
    );

    let stream = pool.submit_tasks(urls("a", 3));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(stats.calls(), 0);

    pool.shutdown();
    let results = stream.collect().await;

    assert!(results.is_empty());
    assert_eq!(stats.calls(), 0);
    assert_eq!(metrics.snapshot().submitted, 3);
    assert_eq!(metrics.snapshot().processed, 0);
    assert_eq!(pool.state(), PoolState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_submit_after_hard_stop_is_skipped() {
    let stats = Arc::new(CallStats::default());
    let metrics = Arc::new(CrawlMetrics::new());
    let pool = WorkerPool::with_metrics(
        sleepy_handler(LATENCY, stats.clone()),
        PoolConfig::new(4),
        metrics.clone(),
    );

    pool.shutdown();
    assert_eq!(pool.state(), PoolState::Draining);

    let stream = pool.submit_tasks(urls("late", 5));
    let results = stream.collect().await;

    assert!(results.is_empty());
    assert_eq!(stats.calls(), 0);
    assert_eq!(metrics.snapshot().skipped, 5);
    assert_eq!(metrics.snapshot().submitted, 0);
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_terminates_pool() {
    let stats = Arc::new(CallStats::default());
    let config = PoolConfig::new(2).with_idle_timeout(Duration::from_millis(200));
    let pool = WorkerPool::new(sleepy_handler(LATENCY, stats), config);
    let started = Instant::now();

    let results = pool.submit_tasks(urls("a", 2)).collect().await;

    assert_eq!(results.len(), 2);
    // 100ms of work followed by 200ms of idleness
    let elapsed = millis(started.elapsed());
    assert!((300..310).contains(&elapsed), "elapsed {}ms", elapsed);
    assert_eq!(pool.state(), PoolState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_idle_pool_without_work_terminates() {
    let config = PoolConfig::new(1).with_idle_timeout(Duration::from_millis(50));
    let pool = WorkerPool::new(sleepy_handler(LATENCY, Arc::default()), config);

    pool.wait_terminated().await;
    assert!(pool.results().next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_new_batch_suspends_idle_timer() {
    let stats = Arc::new(CallStats::default());
    let config = PoolConfig::new(1).with_idle_timeout(Duration::from_millis(150));
    let pool = WorkerPool::new(sleepy_handler(LATENCY, stats.clone()), config);

    let stream = pool.submit_tasks(urls("a", 1));
    assert!(stream.next().await.is_some());

    // idle for 100ms, less than the timeout
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pool.state(), PoolState::Running);
    pool.submit_tasks(urls("b", 1));

    let rest = stream.collect().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(stats.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap_is_respected() {
    let stats = Arc::new(CallStats::default());
    let pool = WorkerPool::new(
        sleepy_handler(Duration::from_millis(10), stats.clone()),
        PoolConfig::new(3),
    );

    let stream = pool.submit_tasks(urls("a", 20));
    pool.graceful_shutdown();
    let results = stream.collect().await;

    assert_eq!(results.len(), 20);
    assert_eq!(stats.max_active(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_every_admitted_task_yields_one_result() {
    let stats = Arc::new(CallStats::default());
    let pool = WorkerPool::new(sleepy_handler(LATENCY, stats.clone()), PoolConfig::new(4));

    let first = pool.submit_tasks(urls("a", 5));
    let second = pool.submit_tasks(urls("b", 5));
    let third = pool.submit_tasks(urls("c", 5));
    assert!(first.is_same(&second) && second.is_same(&third));
    pool.graceful_shutdown();

    let results = first.collect().await;
    let seen: HashSet<String> = results.iter().map(|r| r.task.to_string()).collect();
    assert_eq!(results.len(), 15);
    assert_eq!(seen.len(), 15);
    assert_eq!(stats.calls(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_graceful_shutdown_lets_admitted_work_finish() {
    let stats = Arc::new(CallStats::default());
    let pool = WorkerPool::new(sleepy_handler(LATENCY, stats.clone()), PoolConfig::new(1));
    let mut states = pool.subscribe_state();

    let stream = pool.submit_tasks(urls("a", 2));
    pool.graceful_shutdown();
    pool.graceful_shutdown();

    states.changed().await.unwrap();
    assert_eq!(*states.borrow(), PoolState::Draining);

    let results = stream.collect().await;
    assert!(results.iter().all(|r| r.status == ResultStatus::Ok));
    assert_eq!(results.len(), 2);
    pool.wait_terminated().await;
}

#[tokio::test(start_paused = true)]
async fn test_total_timeout_interrupts_graceful_drain() {
    let stats = Arc::new(CallStats::default());
    let config = PoolConfig::new(1).with_total_timeout(Duration::from_millis(150));
    let pool = WorkerPool::new(sleepy_handler(Duration::from_secs(1), stats.clone()), config);
    let started = Instant::now();

    let stream = pool.submit_tasks(urls("a", 1));
    pool.graceful_shutdown();
    assert_eq!(pool.state(), PoolState::Draining);

    let results = stream.collect().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ResultStatus::Cancelled);
    let elapsed = millis(started.elapsed());
    assert!((150..160).contains(&elapsed), "elapsed {}ms", elapsed);
    assert_eq!(pool.state(), PoolState::Terminated);
    assert_eq!(stats.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_batch_admitted_as_idle_timer_expires_keeps_pool_running() {
    let idle = Duration::from_millis(100);

    for _ in 0..50 {
        let config = PoolConfig::new(1).with_idle_timeout(idle);
        let pool = WorkerPool::new(sleepy_handler(LATENCY, Arc::default()), config);

        // wakes in the same instant as the supervisor's idle timer
        tokio::time::sleep(idle).await;
        if pool.state() != PoolState::Running {
            pool.wait_terminated().await;
            continue;
        }

        let stream = pool.submit_tasks(urls("a", 1));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(pool.state(), PoolState::Running);

        let results = stream.collect().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ResultStatus::Ok);
    }
}

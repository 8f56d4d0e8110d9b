//! Crawl counters and reporting
//!
//! The worker pool and the walker only ever increment counters through the
//! [`MetricsSink`] trait; nothing reads them back to make decisions.
//!
//! - [`CrawlMetrics`]: atomic counters with snapshots
//! - [`NoopMetrics`]: discards everything (the pool's default)
//! - [`spawn_reporter`] / [`print_report`]: periodic and final reports

mod report;

pub use report::{print_report, spawn_reporter};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receiver of crawl counter increments
pub trait MetricsSink: Send + Sync {
    /// A task was admitted into the pool
    fn inc_submitted(&self);

    /// The task handler returned, whatever the outcome
    fn inc_processed(&self);

    /// Tasks were rejected because the pool was no longer running
    fn inc_skipped(&self, count: usize);

    /// The task handler ended because of cancellation
    fn inc_timed_out(&self);

    /// A discovered URL was dropped by the seen filter
    fn inc_duplicate(&self);
}

/// Sink that ignores every increment
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn inc_submitted(&self) {}
    fn inc_processed(&self) {}
    fn inc_skipped(&self, _count: usize) {}
    fn inc_timed_out(&self) {}
    fn inc_duplicate(&self) {}
}

/// Atomic crawl counters
#[derive(Debug, Default)]
pub struct CrawlMetrics {
    submitted: AtomicU64,
    processed: AtomicU64,
    skipped: AtomicU64,
    timed_out: AtomicU64,
    duplicate: AtomicU64,
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads all counters at once
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
        }
    }
}

// Counters are informational only, Relaxed is enough.
impl MetricsSink for CrawlMetrics {
    fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_skipped(&self, count: usize) {
        self.skipped.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_duplicate(&self) {
        self.duplicate.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub processed: u64,
    pub skipped: u64,
    pub timed_out: u64,
    pub duplicate: u64,
}

impl MetricsSnapshot {
    /// Tasks admitted but not yet through the handler
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.processed)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted={} processed={} pending={} skipped={} timed_out={} duplicate={}",
            self.submitted,
            self.processed,
            self.pending(),
            self.skipped,
            self.timed_out,
            self.duplicate
        )
    }
}

//! Periodic and final crawl reports

use crate::crawler::WalkSummary;
use crate::metrics::{CrawlMetrics, MetricsSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Logs a counter snapshot every `interval` until the returned handle is
/// aborted
pub fn spawn_reporter(metrics: Arc<CrawlMetrics>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let snapshot = metrics.snapshot();
            tracing::info!(
                "Progress: {} processed, {} pending, {} timed out",
                snapshot.processed,
                snapshot.pending(),
                snapshot.timed_out
            );
        }
    })
}

/// Prints the final counters and walk summary to stdout
pub fn print_report(snapshot: &MetricsSnapshot, summary: &WalkSummary) {
    println!("=== Walk Report ===\n");

    println!("Pool:");
    println!("  Submitted: {}", snapshot.submitted);
    println!("  Processed: {}", snapshot.processed);
    println!("  Skipped: {}", snapshot.skipped);
    println!("  Timed out: {}", snapshot.timed_out);
    println!();

    println!("Results ({}):", summary.results);
    println!("  OK: {}", summary.ok);
    println!("  Failed: {}", summary.failed);
    println!("  Cancelled: {}", summary.cancelled);
    println!();

    println!("Links:");
    println!("  Discovered: {}", summary.discovered);
    println!("  Duplicate: {}", snapshot.duplicate);
    println!("  Unreadable pages: {}", summary.extract_failures);
    println!();

    let secs = summary.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.results as f64 / secs
    } else {
        0.0
    };
    println!("Elapsed: {:.2}s ({:.2} results/sec)", secs, rate);
}

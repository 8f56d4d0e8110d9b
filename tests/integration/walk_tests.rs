//! Crawl loop tests with in-memory pages

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_walk::crawler::{
    Body, CancelSignal, PoolConfig, Task, TaskHandler, TaskResult, Walker, WorkerPool,
};
use sumi_walk::metrics::CrawlMetrics;
use sumi_walk::SeenFilter;

/// Serves canned HTML and records which URLs were fetched
fn site(
    pages: HashMap<&'static str, &'static str>,
    fetched: Arc<Mutex<Vec<String>>>,
) -> impl TaskHandler {
    move |task: Task, _cancel: CancelSignal| {
        fetched.lock().unwrap().push(task.to_string());
        let result = match pages.get(task.as_str()) {
            Some(html) => TaskResult::ok(task, 200, Body::from_text(*html))
                .with_content_type("text/html; charset=utf-8"),
            None => TaskResult::fail(task, Some(404)),
        };
        std::future::ready(result)
    }
}

fn filter() -> Arc<SeenFilter> {
    Arc::new(SeenFilter::new(10_000, 0.0001).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_seen_links_are_not_fetched_again() {
    let pages = HashMap::from([
        (
            "https://site.example/",
            r#"<a href="/a">a</a> <a href="/b">b</a>"#,
        ),
        ("https://site.example/a", "<p>leaf</p>"),
        ("https://site.example/b", "<p>leaf</p>"),
    ]);
    let fetched = Arc::new(Mutex::new(Vec::new()));
    let metrics = Arc::new(CrawlMetrics::new());
    let config = PoolConfig::new(2).with_idle_timeout(Duration::from_millis(100));
    let pool = WorkerPool::with_metrics(site(pages, fetched.clone()), config, metrics.clone());

    let filter = filter();
    filter.record("https://site.example/b");
    let walker = Walker::new(pool, filter);

    let summary = walker.walk(["https://site.example/"]).await;

    let mut fetched = fetched.lock().unwrap().clone();
    fetched.sort();
    assert_eq!(fetched, vec!["https://site.example/", "https://site.example/a"]);
    assert_eq!(metrics.snapshot().duplicate, 1);
    assert_eq!(summary.ok, 2);
    assert_eq!(summary.discovered, 1);
}

#[tokio::test(start_paused = true)]
async fn test_walk_follows_links_across_pages() {
    let pages = HashMap::from([
        (
            "https://site.example/",
            r#"<a href="/one">1</a><a href="/two#frag">2</a><a href="https://other.example/x?utm_source=feed">x</a>"#,
        ),
        ("https://site.example/one", r#"<a href="/">home</a><a href="/three">3</a>"#),
        ("https://site.example/two", r#"<a href="/one">1</a>"#),
        ("https://site.example/three", "<p>end</p>"),
    ]);
    let fetched = Arc::new(Mutex::new(Vec::new()));
    let metrics = Arc::new(CrawlMetrics::new());
    let config = PoolConfig::new(4).with_idle_timeout(Duration::from_millis(100));
    let pool = WorkerPool::with_metrics(site(pages, fetched.clone()), config, metrics.clone());
    let walker = Walker::new(pool, filter());

    let summary = walker.walk(["https://site.example/"]).await;

    let mut fetched = fetched.lock().unwrap().clone();
    fetched.sort();
    assert_eq!(
        fetched,
        vec![
            "https://other.example/x",
            "https://site.example/",
            "https://site.example/one",
            "https://site.example/three",
            "https://site.example/two",
        ]
    );
    assert_eq!(summary.ok, 4);
    assert_eq!(summary.failed, 1);
    // "/" from page one, "/one" from page two
    assert_eq!(metrics.snapshot().duplicate, 2);
    assert_eq!(metrics.snapshot().skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_walk_still_returns_summary() {
    let fetched = Arc::new(Mutex::new(Vec::new()));
    let pages = HashMap::from([("https://site.example/", r#"<a href="/a">a</a>"#)]);
    let pool = WorkerPool::new(site(pages, fetched), PoolConfig::new(1));
    let walker = Walker::new(pool.clone(), filter());

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        pool.shutdown();
    });

    let summary = walker.walk(["https://site.example/"]).await;
    stopper.await.unwrap();

    assert_eq!(summary.results, 2);
    assert_eq!(summary.ok, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.elapsed, Duration::from_secs(5));
}

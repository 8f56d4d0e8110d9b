//! End-to-end tests against wiremock servers

use std::sync::Arc;
use std::time::Duration;
use sumi_walk::config::{HttpConfig, UserAgentConfig};
use sumi_walk::crawler::{
    build_http_client, HttpHandler, PoolConfig, ResultStatus, Walker, WorkerPool,
};
use sumi_walk::metrics::CrawlMetrics;
use sumi_walk::SeenFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
    }
}

fn handler() -> HttpHandler {
    let client = build_http_client(&HttpConfig::default(), &create_test_agent())
        .expect("Failed to build client");
    HttpHandler::new(client)
}

async fn mount_html(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_handler_classifies_responses() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/ok", "<html><body>hello</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let pool = WorkerPool::new(handler(), PoolConfig::new(2));
    let stream = pool.submit_tasks([
        format!("{}/ok", base_url),
        format!("{}/error", base_url),
        format!("{}/missing", base_url),
    ]);
    pool.graceful_shutdown();

    let mut results = stream.collect().await;
    results.sort_by(|a, b| a.task.cmp(&b.task));
    assert_eq!(results.len(), 3);

    let error = &results[0];
    assert_eq!(error.status, ResultStatus::Fail);
    assert_eq!(error.status_code, Some(500));

    let missing = &results[1];
    assert_eq!(missing.status, ResultStatus::Fail);
    assert_eq!(missing.status_code, Some(404));

    let ok = &mut results[2];
    assert_eq!(ok.status, ResultStatus::Ok);
    assert_eq!(ok.status_code, Some(200));
    assert!(ok.is_html());
    let body = ok.take_body().expect("Missing body");
    assert!(body.read_to_string(1024).await.unwrap().contains("hello"));
}

#[tokio::test]
async fn test_shutdown_cancels_slow_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let pool = WorkerPool::new(handler(), PoolConfig::new(1));
    let stream = pool.submit_tasks([format!("{}/slow", mock_server.uri())]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    pool.shutdown();

    let results = tokio::time::timeout(Duration::from_secs(2), stream.collect())
        .await
        .expect("Stream did not close after shutdown");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ResultStatus::Cancelled);
}

#[tokio::test]
async fn test_full_walk_against_mock_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        r#"<html><body>
            <a href="/a">A</a>
            <a href="/missing">Missing</a>
            <a href="/logo.png">Logo</a>
            <a href="mailto:me@example.com">Mail</a>
        </body></html>"#,
    )
    .await;
    mount_html(&mock_server, "/a", r#"<a href="/">Home</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
        )
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(CrawlMetrics::new());
    let config = PoolConfig::new(4)
        .with_idle_timeout(Duration::from_millis(300))
        .with_total_timeout(Duration::from_secs(10));
    let pool = WorkerPool::with_metrics(handler(), config, metrics.clone());
    let filter = Arc::new(SeenFilter::new(1000, 0.001).unwrap());
    let walker = Walker::new(pool, filter.clone());

    let summary = walker.walk([format!("{}/", base_url)]).await;

    assert_eq!(summary.results, 4);
    assert_eq!(summary.ok, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cancelled, 0);
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.extract_failures, 0);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 4);
    assert_eq!(snapshot.processed, 4);
    assert_eq!(snapshot.duplicate, 1);
    assert_eq!(filter.len(), 4);
}

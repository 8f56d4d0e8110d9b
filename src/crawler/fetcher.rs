//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - Racing each GET request against the run's cancellation signal
//! - Classifying responses into task results

use crate::config::{HttpConfig, UserAgentConfig};
use crate::crawler::{Body, CancelSignal, Task, TaskHandler, TaskResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// Redirects follow reqwest's default policy (up to 10 hops).
///
/// # Example
///
/// ```no_run
/// use sumi_walk::config::{HttpConfig, UserAgentConfig};
/// use sumi_walk::crawler::build_http_client;
///
/// let agent = UserAgentConfig {
///     crawler_name: "SumiWalk".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&HttpConfig::default(), &agent).unwrap();
/// ```
pub fn build_http_client(
    http: &HttpConfig,
    agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        agent.crawler_name, agent.crawler_version, agent.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(http.request_timeout))
        .connect_timeout(Duration::from_millis(http.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Task handler that fetches each URL with a GET request
///
/// | Condition | Result |
/// |-----------|--------|
/// | Cancelled before the request | `Cancelled`, no request sent |
/// | Cancelled while waiting for headers | `Cancelled` |
/// | HTTP 2xx | `Ok` with the unread body |
/// | Any other status | `Fail` with the status code |
/// | Timeout / connect / other transport error | `Fail` without a code |
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
}

impl HttpHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskHandler for HttpHandler {
    async fn handle(&self, task: Task, cancel: CancelSignal) -> TaskResult {
        if cancel.is_cancelled() {
            return TaskResult::cancelled(task);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Request for {} cancelled", task);
                return TaskResult::cancelled(task);
            }
            response = self.client.get(task.as_str()).send() => response,
        };

        match response {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    tracing::debug!("{} returned HTTP {}", task, status.as_u16());
                    return TaskResult::fail(task, Some(status.as_u16()));
                }

                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                let result = TaskResult::ok(task, status.as_u16(), Body::from_response(response));
                match content_type {
                    Some(content_type) => result.with_content_type(content_type),
                    None => result,
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    tracing::debug!("Request timeout for {}", task);
                } else if e.is_connect() {
                    tracing::debug!("Connection failed for {}: {}", task, e);
                } else {
                    tracing::debug!("Request failed for {}: {}", task, e);
                }
                TaskResult::fail(task, e.status().map(|s| s.as_u16()))
            }
        }
    }
}

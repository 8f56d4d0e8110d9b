use crate::crawler::PoolConfig;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Walk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

/// Worker pool behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Maximum number of fetches running at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Total run budget in milliseconds (0 = unbounded)
    #[serde(rename = "total-timeout", default = "default_total_timeout")]
    pub total_timeout: u64,

    /// Idle time in milliseconds before the pool drains (0 = disabled)
    #[serde(rename = "idle-timeout", default = "default_idle_timeout")]
    pub idle_timeout: u64,
}

/// Deduplication filter sizing
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    /// Number of distinct URLs the filter is sized for
    #[serde(rename = "expected-urls", default = "default_expected_urls")]
    pub expected_urls: usize,

    /// Target false positive rate at `expected_urls` insertions
    #[serde(rename = "false-positive-rate", default = "default_false_positive_rate")]
    pub false_positive_rate: f64,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in milliseconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connect timeout in milliseconds
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Largest body the link extractor will read
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interval between progress reports in milliseconds (0 = final report only)
    #[serde(rename = "report-interval", default = "default_report_interval")]
    pub report_interval: u64,
}

/// Crawl input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlConfig {
    /// Seed URLs the walk starts from
    #[serde(default)]
    pub seeds: Vec<String>,
}

fn default_concurrency() -> usize {
    100
}

fn default_total_timeout() -> u64 {
    300_000
}

fn default_idle_timeout() -> u64 {
    5_000
}

fn default_expected_urls() -> usize {
    1_000_000
}

fn default_false_positive_rate() -> f64 {
    0.001
}

fn default_request_timeout() -> u64 {
    2_000
}

fn default_connect_timeout() -> u64 {
    1_000
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_report_interval() -> u64 {
    1_000
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            total_timeout: default_total_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            expected_urls: default_expected_urls(),
            false_positive_rate: default_false_positive_rate(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval: default_report_interval(),
        }
    }
}

impl PoolSettings {
    /// Converts the millisecond settings into a pool configuration
    pub fn to_pool_config(&self) -> PoolConfig {
        PoolConfig {
            concurrency: self.concurrency,
            total_timeout: non_zero_millis(self.total_timeout),
            idle_timeout: non_zero_millis(self.idle_timeout),
            stream_capacity: None,
        }
    }
}

impl MetricsConfig {
    /// Returns the report interval, or None when periodic reports are off
    pub fn interval(&self) -> Option<Duration> {
        non_zero_millis(self.report_interval)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

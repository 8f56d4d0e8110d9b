//! Sumi-Walk: a time-bounded, self-feeding web crawler
//!
//! This crate fetches a seed set of URLs through a bounded worker pool,
//! extracts the links of every successful page, filters out URLs it has
//! already seen and feeds the rest back into the same pool until an idle or
//! total time budget runs out.

pub mod config;
pub mod crawler;
pub mod filter;
pub mod metrics;
pub mod state;
pub mod url;

use thiserror::Error;

/// Errors raised while setting up a walk
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while sizing the deduplication filter
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("Expected URL count must be greater than 0")]
    ZeroCapacity,

    #[error("False positive rate must be in (0, 1), got {0}")]
    InvalidFalsePositiveRate(f64),
}

/// Errors raised while reading a response body
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Failed to read body: {0}")]
    Read(#[from] reqwest::Error),

    #[error("Body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Errors raised while extracting links from a page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid base URL {url}: {source}")]
    BaseUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("Body error: {0}")]
    Body(#[from] BodyError),

    #[error("HTML parse error: {0}")]
    Parse(String),
}

/// Result type alias for Sumi-Walk operations
pub type Result<T> = std::result::Result<T, WalkError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    PoolConfig, ResultStatus, ResultStream, Task, TaskResult, WalkSummary, Walker, WorkerPool,
};
pub use filter::SeenFilter;
pub use metrics::{CrawlMetrics, MetricsSink, MetricsSnapshot};
pub use state::PoolState;

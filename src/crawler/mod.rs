//! Crawler module: the worker pool and the walk built on top of it
//!
//! This module contains the core crawling logic, including:
//! - A bounded worker pool with a timed lifecycle ([`WorkerPool`])
//! - The task handler seam and its HTTP implementation ([`HttpHandler`])
//! - HTML link extraction ([`HtmlLinkExtractor`])
//! - The self-feeding crawl loop ([`Walker`])

mod cancel;
mod fetcher;
mod handler;
mod parser;
mod pool;
mod task;
mod walker;

pub use cancel::CancelSignal;
pub use fetcher::{build_http_client, HttpHandler};
pub use handler::TaskHandler;
pub use parser::{HtmlLinkExtractor, LinkExtractor};
pub use pool::{PoolConfig, ResultStream, WorkerPool};
pub use task::{Body, ResultStatus, Task, TaskResult};
pub use walker::{WalkSummary, Walker};

//! Self-feeding crawl loop
//!
//! The walker owns the feedback loop around a [`WorkerPool`]: it submits the
//! seeds, consumes the shared result stream, spawns one extraction task per
//! successful HTML page and resubmits whatever those tasks discover. The walk
//! ends when the pool terminates (idle timeout, total timeout or an explicit
//! stop) and every extraction has finished.

use crate::config::Config;
use crate::crawler::{
    build_http_client, Body, HtmlLinkExtractor, HttpHandler, LinkExtractor, ResultStatus, Task,
    TaskHandler, TaskResult, WorkerPool,
};
use crate::filter::SeenFilter;
use crate::metrics::MetricsSink;
use crate::url::canonicalize;
use crate::ExtractError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use url::Url;

const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Totals for one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Results received from the stream
    pub results: u64,
    pub ok: u64,
    pub failed: u64,
    pub cancelled: u64,

    /// URLs found on pages that passed the seen filter
    pub discovered: u64,

    /// Pages whose body could not be read or parsed
    pub extract_failures: u64,

    pub elapsed: Duration,
}

impl WalkSummary {
    fn record(&mut self, status: ResultStatus) {
        self.results += 1;
        match status {
            ResultStatus::Ok => self.ok += 1,
            ResultStatus::Fail => self.failed += 1,
            ResultStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Links found on one page, or why there are none
type Extraction = (Task, Result<Vec<String>, ExtractError>);

/// Drives a crawl over a worker pool
///
/// Only `http` and `https` URLs are crawled. Seeds and discovered links go
/// through [`canonicalize`], which rejects every other scheme.
pub struct Walker<H> {
    pool: WorkerPool<H>,
    filter: Arc<SeenFilter>,
    extractor: Arc<dyn LinkExtractor>,
    metrics: Arc<dyn MetricsSink>,
    max_body_bytes: usize,
}

impl<H: TaskHandler> Walker<H> {
    /// Creates a walker with the HTML extractor; duplicates are reported to
    /// the pool's metrics sink
    pub fn new(pool: WorkerPool<H>, filter: Arc<SeenFilter>) -> Self {
        let metrics = Arc::clone(pool.metrics());
        Self {
            pool,
            filter,
            extractor: Arc::new(HtmlLinkExtractor),
            metrics,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Bodies larger than `limit` bytes are not parsed
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn pool(&self) -> &WorkerPool<H> {
        &self.pool
    }

    /// Crawls from `seeds` until the pool terminates
    ///
    /// Seeds are canonicalized and recorded in the seen filter first. Seeds
    /// that are not absolute `http`/`https` URLs, or that were already seen,
    /// are logged and not submitted.
    pub async fn walk<I, S>(&self, seeds: I) -> WalkSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let started = Instant::now();
        let mut summary = WalkSummary::default();

        let seeds = self.admit_seeds(seeds);
        if seeds.is_empty() {
            tracing::warn!("No new seeds to crawl, waiting for the pool to stop");
        } else {
            tracing::info!("Walking from {} seeds", seeds.len());
        }
        let stream = self.pool.submit_tasks(seeds);

        let mut extractions: JoinSet<Extraction> = JoinSet::new();
        loop {
            tokio::select! {
                result = stream.next() => match result {
                    Some(result) => self.consume(result, &mut summary, &mut extractions),
                    None => break,
                },
                Some(joined) = extractions.join_next(), if !extractions.is_empty() => {
                    self.finish_extraction(joined, &mut summary);
                }
            }
        }

        tracing::debug!(
            "Result stream closed, waiting for {} extractions",
            extractions.len()
        );
        while let Some(joined) = extractions.join_next().await {
            self.finish_extraction(joined, &mut summary);
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            "Walk finished: {} results ({} ok) in {:?}",
            summary.results,
            summary.ok,
            summary.elapsed
        );
        summary
    }

    fn admit_seeds<I, S>(&self, seeds: I) -> Vec<Task>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut admitted = Vec::new();
        for seed in seeds {
            let seed = seed.as_ref();
            let Some(url) = canonicalize(seed) else {
                tracing::warn!("Skipping invalid seed: {}", seed);
                continue;
            };
            if self.filter.check_and_record(&url) {
                admitted.push(Task::from(url));
            } else {
                tracing::debug!("Duplicate seed: {}", seed);
                self.metrics.inc_duplicate();
            }
        }
        admitted
    }

    fn consume(
        &self,
        mut result: TaskResult,
        summary: &mut WalkSummary,
        extractions: &mut JoinSet<Extraction>,
    ) {
        summary.record(result.status);
        if !result.is_ok() {
            return;
        }
        if !result.is_html() {
            tracing::debug!(
                "Not following {}: content type {:?}",
                result.task,
                result.content_type
            );
            return;
        }
        let Some(body) = result.take_body() else {
            return;
        };

        let page = result.task;
        let extractor = Arc::clone(&self.extractor);
        let filter = Arc::clone(&self.filter);
        let metrics = Arc::clone(&self.metrics);
        let limit = self.max_body_bytes;

        extractions.spawn(async move {
            let links = extract_new_links(
                &page,
                body,
                limit,
                extractor.as_ref(),
                &filter,
                metrics.as_ref(),
            )
            .await;
            (page, links)
        });
    }

    fn finish_extraction(
        &self,
        joined: Result<Extraction, JoinError>,
        summary: &mut WalkSummary,
    ) {
        let urls = match joined {
            Ok((_, Ok(urls))) => urls,
            Ok((page, Err(e))) => {
                tracing::warn!("Failed to extract links from {}: {}", page, e);
                summary.extract_failures += 1;
                return;
            }
            Err(e) => {
                tracing::warn!("Extraction task failed: {}", e);
                summary.extract_failures += 1;
                return;
            }
        };

        if urls.is_empty() {
            return;
        }
        summary.discovered += urls.len() as u64;

        if self.pool.state().is_terminal() {
            tracing::debug!("Pool terminated, {} discovered URLs skipped", urls.len());
            self.metrics.inc_skipped(urls.len());
            return;
        }
        self.pool.submit_tasks(urls);
    }
}

impl Walker<HttpHandler> {
    /// Builds an HTTP walker from a loaded config
    ///
    /// Fails fast if the HTTP client cannot be built or the seen filter
    /// sizing is invalid.
    pub fn from_config(config: &Config, metrics: Arc<dyn MetricsSink>) -> crate::Result<Self> {
        let client = build_http_client(&config.http, &config.user_agent)?;
        let filter = SeenFilter::new(
            config.filter.expected_urls,
            config.filter.false_positive_rate,
        )?;
        tracing::info!(
            "Seen filter: {} bits, {} hashes",
            filter.bit_count(),
            filter.hash_count()
        );

        let pool = WorkerPool::with_metrics(
            HttpHandler::new(client),
            config.pool.to_pool_config(),
            metrics,
        );
        Ok(Self::new(pool, Arc::new(filter)).with_max_body_bytes(config.http.max_body_bytes))
    }
}

/// Reads one page and returns the links on it that were not seen before
async fn extract_new_links(
    page: &Task,
    body: Body,
    limit: usize,
    extractor: &dyn LinkExtractor,
    filter: &SeenFilter,
    metrics: &dyn MetricsSink,
) -> Result<Vec<String>, ExtractError> {
    let base_url = Url::parse(page.as_str()).map_err(|source| ExtractError::BaseUrl {
        url: page.to_string(),
        source,
    })?;
    let html = body.read_to_string(limit).await?;
    let links = extractor.extract(&html, &base_url)?;

    let mut fresh = Vec::new();
    for link in links {
        let Some(url) = canonicalize(&link) else {
            continue;
        };
        if filter.check_and_record(&url) {
            fresh.push(url);
        } else {
            metrics.inc_duplicate();
        }
    }

    tracing::debug!("{}: {} new links", page, fresh.len());
    Ok(fresh)
}

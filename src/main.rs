//! Sumi-Walk main entry point
//!
//! This is the command-line interface for the Sumi-Walk crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_walk::config::{load_config_with_hash, validate, Config};
use sumi_walk::crawler::Walker;
use sumi_walk::metrics::{print_report, spawn_reporter, CrawlMetrics};
use tracing_subscriber::EnvFilter;

/// Sumi-Walk: a time-bounded, self-feeding web crawler
///
/// Sumi-Walk fetches its seed URLs, follows every link it has not seen
/// before and stops once the crawl goes idle or its time budget runs out.
#[derive(Parser, Debug)]
#[command(name = "sumi-walk")]
#[command(version)]
#[command(about = "A time-bounded, self-feeding web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Additional seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.seeds.is_empty() {
        config.crawl.seeds.extend(cli.seeds);
        validate(&config).context("Invalid --seed argument")?;
    }
    if config.crawl.seeds.is_empty() {
        bail!("No seed URLs: add [crawl] seeds to the config or pass --seed");
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_walk(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_walk=info,warn"),
            1 => EnvFilter::new("sumi_walk=debug,info"),
            2 => EnvFilter::new("sumi_walk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    let pool = config.pool.to_pool_config();

    println!("=== Sumi-Walk Dry Run ===\n");

    println!("Pool:");
    println!("  Concurrency: {}", pool.concurrency);
    println!("  Total timeout: {}", describe(pool.total_timeout));
    println!("  Idle timeout: {}", describe(pool.idle_timeout));

    println!("\nSeen filter:");
    println!("  Expected URLs: {}", config.filter.expected_urls);
    println!("  False positive rate: {}", config.filter.false_positive_rate);

    println!("\nHTTP:");
    println!("  Request timeout: {}ms", config.http.request_timeout);
    println!("  Connect timeout: {}ms", config.http.connect_timeout);
    println!("  Max body: {} bytes", config.http.max_body_bytes);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nSeeds ({}):", config.crawl.seeds.len());
    for seed in &config.crawl.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

fn describe(timeout: Option<std::time::Duration>) -> String {
    match timeout {
        Some(timeout) => format!("{}ms", timeout.as_millis()),
        None => "none".to_string(),
    }
}

/// Handles the main walk
async fn handle_walk(config: Config) -> anyhow::Result<()> {
    let metrics = Arc::new(CrawlMetrics::new());
    let walker = Walker::from_config(&config, metrics.clone())
        .context("Failed to set up the walk")?;

    let reporter = config
        .metrics
        .interval()
        .map(|interval| spawn_reporter(Arc::clone(&metrics), interval));

    // Ctrl-C is a hard stop: the walk still drains and reports
    let interrupt = tokio::spawn({
        let pool = walker.pool().clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping the walk");
                pool.shutdown();
            }
        }
    });

    let summary = walker.walk(&config.crawl.seeds).await;

    interrupt.abort();
    if let Some(reporter) = reporter {
        reporter.abort();
    }

    print_report(&metrics.snapshot(), &summary);
    Ok(())
}

//! Configuration module for Sumi-Walk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_walk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("walk.toml")).unwrap();
//! println!("Pool concurrency: {}", config.pool.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FilterSettings, HttpConfig, MetricsConfig, PoolSettings,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

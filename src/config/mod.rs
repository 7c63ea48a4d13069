//! Configuration module for crs-crawler
//!
//! Settings come from three layers: built-in defaults, an optional TOML file,
//! and command-line overrides applied by the binary.
//!
//! # Example
//!
//! ```no_run
//! use crs_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.parallelism);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, LeafSiblingPolicy, TerminationPolicy, UserAgentConfig,
    DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_PARALLELISM, DEFAULT_START_URL,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;

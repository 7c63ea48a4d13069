//! crs-crawler: discovers terminal CRS identifier URLs
//!
//! This crate walks an XML "identifiers" hierarchy starting from a root
//! listing document, following child `identifier` links with a bounded pool
//! of concurrent workers, and collects the URLs of every terminal (non-listing)
//! resource it reaches.

pub mod config;
pub mod crawler;
pub mod output;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Per-URL failures never surface here; they are logged and dropped by the
/// worker pool. Only setup failures and scheduler defects end a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Crawl worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Crawl worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
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

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlResult};

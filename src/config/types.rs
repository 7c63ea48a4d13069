use serde::Deserialize;
use std::time::Duration;

/// Root listing of the OGC CRS definitions register
pub const DEFAULT_START_URL: &str = "https://www.opengis.net/def/crs/";

/// Default number of crawl workers
pub const DEFAULT_PARALLELISM: u32 = 8;

/// Default grace period an idle worker waits for new work
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 3000;

/// Main configuration structure for crs-crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Root listing document the crawl starts from
    pub start_url: String,

    /// Number of workers, which is also the maximum number of concurrent
    /// in-flight fetches
    pub parallelism: u32,

    /// How long a worker waits on an empty frontier before re-checking (or,
    /// under `TerminationPolicy::IdleTimeout`, before giving up)
    pub idle_timeout_ms: u64,

    /// How workers decide the crawl is over
    pub termination: TerminationPolicy,

    /// What to do with the siblings of a URL that turned out to be a leaf
    pub leaf_siblings: LeafSiblingPolicy,

    /// Overall per-request timeout; `None` leaves it to the HTTP client
    pub request_timeout_secs: Option<u64>,
}

impl CrawlerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            parallelism: DEFAULT_PARALLELISM,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            termination: TerminationPolicy::default(),
            leaf_siblings: LeafSiblingPolicy::default(),
            request_timeout_secs: None,
        }
    }
}

/// Crawl termination strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationPolicy {
    /// Workers exit once the queue is empty and no item is in flight
    #[default]
    Drain,

    /// Workers exit after one idle period without work, even if another
    /// worker is still fetching. Children enqueued after every worker has
    /// left are never processed.
    IdleTimeout,
}

/// Policy for siblings of a leaf document
///
/// `AssumeLeaves` treats all children of a parent as leaves once one of them
/// was fetched and found to be a leaf, and records the rest without fetching
/// them. This relies on each parent's children being homogeneous; a listing
/// hidden among leaf siblings is recorded as a result instead of expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafSiblingPolicy {
    #[default]
    AssumeLeaves,
    FetchEach,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

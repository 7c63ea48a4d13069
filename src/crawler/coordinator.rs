//! Crawl coordinator - seeds the frontier, runs the pool, collects results
//!
//! The coordinator owns the lifetime of one crawl: a fresh frontier seeded
//! with the start URL, one worker pool over it, and the result list that
//! comes out once the pool has stopped.

use crate::config::{validate, Config, CrawlerConfig};
use crate::crawler::fetcher::{build_http_client, Fetch, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::scheduler::{PoolStats, Scheduler, SchedulerConfig};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// Terminal URLs discovered by a crawl
///
/// Entries are unique but unordered; concurrent workers append them in
/// whatever order their fetches complete.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    urls: Vec<String>,
    stats: PoolStats,
}

impl CrawlResult {
    pub fn new(urls: Vec<String>, stats: PoolStats) -> Self {
        Self { urls, stats }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

impl IntoIterator for CrawlResult {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.urls.into_iter()
    }
}

/// Main crawler structure
pub struct Crawler<F = HttpFetcher> {
    config: CrawlerConfig,
    fetcher: Arc<F>,
}

impl Crawler<HttpFetcher> {
    /// Creates a crawler that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Configuration is valid and the HTTP client was built
    /// * `Err(CrawlError)` - Invalid configuration or client setup failure
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        Ok(Self::with_fetcher(config.crawler, HttpFetcher::new(client)))
    }
}

impl<F: Fetch> Crawler<F> {
    /// Creates a crawler around any fetcher
    pub fn with_fetcher(config: CrawlerConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher: Arc::new(fetcher),
        }
    }

    /// Runs one crawl to completion
    ///
    /// Per-URL failures are logged and dropped; only a worker panic makes
    /// this return an error.
    pub async fn run(&self) -> Result<CrawlResult> {
        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl at {} with {} workers",
            self.config.start_url,
            self.config.parallelism
        );

        let frontier = Arc::new(Frontier::new());
        frontier.enqueue(self.config.start_url.as_str(), None);

        let scheduler = Scheduler::new(
            Arc::clone(&frontier),
            Arc::clone(&self.fetcher),
            SchedulerConfig::from(&self.config),
        );
        let stats = scheduler.run().await?;

        let urls = frontier.take_results();
        tracing::info!(
            "Crawl completed: {} URLs found ({} fetched, {} skipped, {} failed) of {} seen in {:?}",
            urls.len(),
            stats.fetched,
            stats.skipped,
            stats.failed,
            frontier.seen_len(),
            start_time.elapsed()
        );

        Ok(CrawlResult::new(urls, stats))
    }
}

/// Crawls from `start_url` with `parallelism` workers and default settings
///
/// # Example
///
/// ```no_run
/// use crs_crawler::crawler::crawl;
///
/// # async fn example() -> Result<(), crs_crawler::CrawlError> {
/// let result = crawl("https://www.opengis.net/def/crs/", 8).await?;
/// for url in result {
///     println!("{}", url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn crawl(start_url: &str, parallelism: u32) -> Result<CrawlResult> {
    let mut config = Config::default();
    config.crawler.start_url = start_url.to_string();
    config.crawler.parallelism = parallelism;

    run_crawl(config).await
}

/// Runs a crawl with a full configuration
pub async fn run_crawl(config: Config) -> Result<CrawlResult> {
    Crawler::new(config)?.run().await
}

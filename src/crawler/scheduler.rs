//! Worker pool driving the crawl
//!
//! This module handles:
//! - Spawning a fixed number of workers that share one frontier
//! - The per-item step: skip-parent shortcut, fetch, expand or record
//! - Deciding when a worker stops
//!
//! The worker count is the only concurrency bound: each worker has at most one
//! fetch outstanding, so `parallelism` is the maximum number of concurrent
//! in-flight fetches.

use crate::config::{CrawlerConfig, LeafSiblingPolicy, TerminationPolicy};
use crate::crawler::fetcher::{Fetch, FetchOutcome};
use crate::crawler::frontier::{Dequeue, Frontier, WorkItem};
use crate::CrawlError;
use std::any::Any;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Settings for one worker pool run
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of workers (and maximum concurrent fetches)
    pub parallelism: usize,

    /// How long an idle worker waits for work before re-evaluating
    pub idle_timeout: Duration,

    pub termination: TerminationPolicy,

    pub leaf_siblings: LeafSiblingPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for SchedulerConfig {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            parallelism: config.parallelism as usize,
            idle_timeout: config.idle_timeout(),
            termination: config.termination,
            leaf_siblings: config.leaf_siblings,
        }
    }
}

/// Counters collected by the workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Fetches issued
    pub fetched: usize,

    /// Listing documents expanded
    pub listings: usize,

    /// Leaves confirmed by a fetch
    pub leaves: usize,

    /// Leaves recorded through the skip-parent shortcut, without a fetch
    pub skipped: usize,

    /// Fetches that failed and were dropped
    pub failed: usize,

    /// Failed fetches whose body was not well-formed XML
    pub malformed: usize,
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, other: Self) {
        self.fetched += other.fetched;
        self.listings += other.listings;
        self.leaves += other.leaves;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.malformed += other.malformed;
    }
}

/// Runs a pool of workers over a shared frontier
pub struct Scheduler<F> {
    frontier: Arc<Frontier>,
    fetcher: Arc<F>,
    config: SchedulerConfig,
}

impl<F: Fetch> Scheduler<F> {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `frontier` - Seeded frontier shared with the caller
    /// * `fetcher` - Document fetcher used by every worker
    /// * `config` - Pool settings
    pub fn new(frontier: Arc<Frontier>, fetcher: Arc<F>, config: SchedulerConfig) -> Self {
        Self {
            frontier,
            fetcher,
            config,
        }
    }

    /// Runs the pool until every worker has stopped
    ///
    /// # Returns
    ///
    /// * `Ok(PoolStats)` - All workers exited normally
    /// * `Err(CrawlError)` - A worker panicked; the remaining workers are aborted
    pub async fn run(&self) -> Result<PoolStats, CrawlError> {
        let parallelism = self.config.parallelism.max(1);
        tracing::debug!("Starting {} crawl workers", parallelism);

        let mut workers = JoinSet::new();
        for id in 0..parallelism {
            let worker = Worker {
                id,
                frontier: Arc::clone(&self.frontier),
                fetcher: Arc::clone(&self.fetcher),
                config: self.config.clone(),
            };
            workers.spawn(worker.run());
        }

        let mut stats = PoolStats::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_stats) => stats += worker_stats,
                Err(e) if e.is_panic() => {
                    workers.abort_all();
                    let message = panic_message(e.into_panic());
                    tracing::error!("Crawl worker panicked: {}", message);
                    return Err(CrawlError::WorkerPanicked(message));
                }
                Err(e) => {
                    workers.abort_all();
                    return Err(e.into());
                }
            }
        }

        Ok(stats)
    }
}

struct Worker<F> {
    id: usize,
    frontier: Arc<Frontier>,
    fetcher: Arc<F>,
    config: SchedulerConfig,
}

impl<F: Fetch> Worker<F> {
    async fn run(self) -> PoolStats {
        let mut stats = PoolStats::default();

        loop {
            let item = match self.frontier.try_dequeue(self.config.idle_timeout).await {
                Dequeue::Item(item) => item,
                Dequeue::Drained => {
                    tracing::debug!("Worker {} exiting: frontier drained", self.id);
                    break;
                }
                Dequeue::Idle => match self.config.termination {
                    TerminationPolicy::Drain => continue,
                    TerminationPolicy::IdleTimeout => {
                        tracing::debug!(
                            "Worker {} exiting: idle for {:?}",
                            self.id,
                            self.config.idle_timeout
                        );
                        break;
                    }
                },
            };

            self.process(item, &mut stats).await;
            self.frontier.complete();
        }

        stats
    }

    async fn process(&self, item: WorkItem, stats: &mut PoolStats) {
        if self.config.leaf_siblings == LeafSiblingPolicy::AssumeLeaves {
            if let Some(parent) = item.parent_url.as_deref() {
                if self.frontier.is_skip(parent) {
                    tracing::info!("Skipping {} (siblings under {} are leaves)", item.url, parent);
                    self.frontier.record_result(item.url);
                    stats.skipped += 1;
                    return;
                }
            }
        }

        tracing::info!("Fetching {}", item.url);
        stats.fetched += 1;

        match self.fetcher.fetch(&item.url).await {
            FetchOutcome::Error(e) => {
                let kind = if e.is_transport() {
                    "unreachable"
                } else {
                    "malformed"
                };
                tracing::warn!("Dropping {} ({}): {}", e.url(), kind, e);
                if e.is_parse() {
                    stats.malformed += 1;
                }
                stats.failed += 1;
            }
            FetchOutcome::Listing(children) => {
                stats.listings += 1;
                let mut added = 0;
                for child in &children {
                    if self.frontier.enqueue(child.as_str(), Some(item.url.as_str())) {
                        added += 1;
                    }
                }
                tracing::debug!(
                    "{} lists {} children ({} new, {} pending)",
                    item.url,
                    children.len(),
                    added,
                    self.frontier.pending_len()
                );
            }
            FetchOutcome::Leaf => {
                stats.leaves += 1;
                if self.config.leaf_siblings == LeafSiblingPolicy::AssumeLeaves {
                    if let Some(parent) = item.parent_url.as_deref() {
                        self.frontier.mark_skip(parent);
                    }
                }
                self.frontier.record_result(item.url);
                tracing::trace!("{} results so far", self.frontier.results_len());
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchError;
    use std::collections::{HashMap, HashSet};
    use std::future::Future;
    use std::sync::Mutex;

    /// Canned response for one URL
    #[derive(Debug, Clone)]
    pub(crate) enum Canned {
        Listing(Vec<String>),
        Leaf,
        Status(u16),
        Panic,
    }

    /// Fetcher that serves canned outcomes and records every call
    #[derive(Debug, Default)]
    pub(crate) struct CannedFetcher {
        responses: HashMap<String, (Canned, Duration)>,
        calls: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn listing(self, url: &str, children: &[&str]) -> Self {
            let children = children.iter().map(|c| c.to_string()).collect();
            self.respond(url, Canned::Listing(children), Duration::ZERO)
        }

        pub(crate) fn leaf(self, url: &str) -> Self {
            self.respond(url, Canned::Leaf, Duration::ZERO)
        }

        pub(crate) fn respond(mut self, url: &str, canned: Canned, delay: Duration) -> Self {
            self.responses.insert(url.to_string(), (canned, delay));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn call_count(&self, url: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == url).count()
        }
    }

    impl Fetch for CannedFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = FetchOutcome> + Send {
            self.calls.lock().unwrap().push(url.to_string());
            let (canned, delay) = self
                .responses
                .get(url)
                .cloned()
                .unwrap_or((Canned::Status(404), Duration::ZERO));
            let url = url.to_string();

            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match canned {
                    Canned::Listing(children) => FetchOutcome::Listing(children),
                    Canned::Leaf => FetchOutcome::Leaf,
                    Canned::Status(status) => FetchOutcome::Error(FetchError::Status { url, status }),
                    Canned::Panic => panic!("fetcher exploded on {}", url),
                }
            }
        }
    }

    fn config(parallelism: usize, leaf_siblings: LeafSiblingPolicy) -> SchedulerConfig {
        SchedulerConfig {
            parallelism,
            idle_timeout: Duration::from_millis(100),
            termination: TerminationPolicy::Drain,
            leaf_siblings,
        }
    }

    async fn run_pool(
        fetcher: &Arc<CannedFetcher>,
        config: SchedulerConfig,
    ) -> (HashSet<String>, Vec<String>, PoolStats) {
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue("root", None);

        let scheduler = Scheduler::new(Arc::clone(&frontier), Arc::clone(fetcher), config);
        let stats = tokio::time::timeout(Duration::from_secs(10), scheduler.run())
            .await
            .expect("pool did not terminate")
            .expect("pool failed");

        let results = frontier.take_results();
        let set = results.iter().cloned().collect();
        (set, results, stats)
    }

    fn set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn scenario_a() -> CannedFetcher {
        CannedFetcher::new()
            .listing("root", &["A", "B"])
            .leaf("A")
            .listing("B", &["C", "D"])
            .leaf("C")
            .leaf("D")
    }

    #[tokio::test]
    async fn test_listing_tree_collects_every_leaf() {
        let fetcher = Arc::new(scenario_a());
        let (set_result, results, stats) =
            run_pool(&fetcher, config(1, LeafSiblingPolicy::FetchEach)).await;

        assert_eq!(set_result, set(&["A", "C", "D"]));
        assert_eq!(results.len(), 3);
        assert_eq!(stats.fetched, 5);
        assert_eq!(stats.listings, 2);
        assert_eq!(stats.leaves, 3);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn test_listing_tree_with_shortcut_when_listing_fetched_first() {
        // B is fetched while A is still in flight, so the root is not yet
        // marked when B is dequeued
        let fetcher = Arc::new(scenario_a().respond(
            "A",
            Canned::Leaf,
            Duration::from_millis(200),
        ));
        let (set_result, results, _) =
            run_pool(&fetcher, config(2, LeafSiblingPolicy::AssumeLeaves)).await;

        assert_eq!(set_result, set(&["A", "C", "D"]));
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_leaf_sibling_is_recorded_without_fetch() {
        let fetcher = Arc::new(CannedFetcher::new().listing("root", &["X", "Y"]).leaf("X").leaf("Y"));
        let (set_result, _, stats) =
            run_pool(&fetcher, config(1, LeafSiblingPolicy::AssumeLeaves)).await;

        assert_eq!(set_result, set(&["X", "Y"]));
        assert_eq!(fetcher.calls(), vec!["root", "X"]);
        assert_eq!(fetcher.call_count("Y"), 0);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn test_fetch_each_policy_fetches_siblings() {
        let fetcher = Arc::new(CannedFetcher::new().listing("root", &["X", "Y"]).leaf("X").leaf("Y"));
        let (set_result, _, stats) =
            run_pool(&fetcher, config(1, LeafSiblingPolicy::FetchEach)).await;

        assert_eq!(set_result, set(&["X", "Y"]));
        assert_eq!(fetcher.call_count("Y"), 1);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn test_shortcut_trusts_homogeneous_siblings() {
        // Y is actually a listing, but its sibling X already marked the root
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["X", "Y"])
                .leaf("X")
                .listing("Y", &["Z"])
                .leaf("Z"),
        );
        let (set_result, _, _) =
            run_pool(&fetcher, config(1, LeafSiblingPolicy::AssumeLeaves)).await;

        assert_eq!(set_result, set(&["X", "Y"]));
        assert_eq!(fetcher.call_count("Y"), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_dropped() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["A", "B"])
                .respond("A", Canned::Status(500), Duration::ZERO)
                .leaf("B"),
        );
        let (set_result, _, stats) =
            run_pool(&fetcher, config(1, LeafSiblingPolicy::AssumeLeaves)).await;

        assert_eq!(set_result, set(&["B"]));
        assert_eq!(fetcher.call_count("B"), 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_failed_listing_does_not_stop_cousins() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["A", "B"])
                .respond("A", Canned::Status(503), Duration::ZERO)
                .listing("B", &["C"])
                .leaf("C"),
        );
        let (set_result, _, _) = run_pool(&fetcher, config(3, LeafSiblingPolicy::AssumeLeaves)).await;

        assert_eq!(set_result, set(&["C"]));
    }

    #[tokio::test]
    async fn test_duplicate_children_are_fetched_once() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["A", "B", "A"])
                .listing("A", &["C", "root"])
                .listing("B", &["C"])
                .leaf("C"),
        );
        let (_, results, _) = run_pool(&fetcher, config(4, LeafSiblingPolicy::FetchEach)).await;

        assert_eq!(results, vec!["C"]);
        assert_eq!(fetcher.call_count("root"), 1);
        assert_eq!(fetcher.call_count("A"), 1);
        assert_eq!(fetcher.call_count("C"), 1);
    }

    #[tokio::test]
    async fn test_terminates_for_any_parallelism() {
        for parallelism in [1, 2, 3, 8, 32] {
            let fetcher = Arc::new(scenario_a());
            let (set_result, results, _) =
                run_pool(&fetcher, config(parallelism, LeafSiblingPolicy::FetchEach)).await;

            assert_eq!(set_result, set(&["A", "C", "D"]), "parallelism {}", parallelism);
            assert_eq!(results.len(), 3, "parallelism {}", parallelism);
        }
    }

    #[tokio::test]
    async fn test_slow_listing_outlasting_idle_timeout_is_drained() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["slow", "fast"])
                .respond(
                    "slow",
                    Canned::Listing(vec!["late".to_string()]),
                    Duration::from_millis(400),
                )
                .listing("fast", &[])
                .leaf("late"),
        );
        let mut config = config(4, LeafSiblingPolicy::AssumeLeaves);
        config.idle_timeout = Duration::from_millis(50);

        let (set_result, _, _) = run_pool(&fetcher, config).await;
        assert_eq!(set_result, set(&["late"]));
    }

    #[tokio::test]
    async fn test_idle_timeout_policy_finishes() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["slow"])
                .respond(
                    "slow",
                    Canned::Listing(vec!["late".to_string()]),
                    Duration::from_millis(200),
                )
                .leaf("late"),
        );
        let mut config = config(4, LeafSiblingPolicy::AssumeLeaves);
        config.termination = TerminationPolicy::IdleTimeout;
        config.idle_timeout = Duration::from_millis(50);

        // Idle workers leave early; the worker that fetched "slow" picks up
        // its own child
        let (set_result, _, _) = run_pool(&fetcher, config).await;
        assert_eq!(set_result, set(&["late"]));
    }

    #[tokio::test]
    async fn test_worker_panic_is_fatal() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .listing("root", &["A"])
                .respond("A", Canned::Panic, Duration::ZERO),
        );
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue("root", None);

        let scheduler = Scheduler::new(
            frontier,
            fetcher,
            config(2, LeafSiblingPolicy::AssumeLeaves),
        );
        let result = tokio::time::timeout(Duration::from_secs(10), scheduler.run())
            .await
            .expect("pool did not terminate");

        match result {
            Err(CrawlError::WorkerPanicked(message)) => assert!(message.contains("exploded")),
            other => panic!("expected worker panic, got {:?}", other),
        }
    }

    #[test]
    fn test_stats_add() {
        let mut total = PoolStats {
            fetched: 1,
            listings: 1,
            ..Default::default()
        };
        total += PoolStats {
            fetched: 2,
            leaves: 1,
            skipped: 3,
            failed: 1,
            ..Default::default()
        };
        total += PoolStats {
            failed: 1,
            malformed: 1,
            ..Default::default()
        };

        assert_eq!(
            total,
            PoolStats {
                fetched: 3,
                listings: 1,
                leaves: 1,
                skipped: 3,
                failed: 2,
                malformed: 1,
            }
        );
    }
}

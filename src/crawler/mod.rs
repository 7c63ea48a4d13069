//! Crawler module for identifier discovery
//!
//! This module contains the core crawling logic, including:
//! - XML parsing and listing/leaf classification
//! - HTTP fetching of identifier documents
//! - The shared frontier of pending URLs
//! - The worker pool and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod scheduler;

pub use coordinator::{crawl, run_crawl, CrawlResult, Crawler};
pub use fetcher::{build_http_client, fetch_url, Fetch, FetchError, FetchOutcome, HttpFetcher};
pub use frontier::{Dequeue, Frontier, WorkItem};
pub use parser::{classify_document, local_name, Classification, ParseError};
pub use scheduler::{PoolStats, Scheduler, SchedulerConfig};

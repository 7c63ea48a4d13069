//! HTTP fetcher implementation
//!
//! This module retrieves identifier documents and turns each response into a
//! classified outcome. It performs exactly one GET per call, with no retries,
//! and never escalates a failure: every error is folded into
//! `FetchOutcome::Error` so the crawl can carry on.
//!
//! The fetcher knows nothing about the frontier. Workers call it and act on
//! the returned value, which keeps it testable against canned documents.

use crate::config::UserAgentConfig;
use crate::crawler::parser::{classify_document, Classification, ParseError};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result of fetching and classifying one URL
#[derive(Debug)]
pub enum FetchOutcome {
    /// Listing document with the child URLs to enqueue
    Listing(Vec<String>),

    /// Terminal resource
    Leaf,

    /// The URL could not be fetched or parsed
    Error(FetchError),
}

impl From<Classification> for FetchOutcome {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Listing(children) => FetchOutcome::Listing(children),
            Classification::Leaf => FetchOutcome::Leaf,
        }
    }
}

/// Per-URL fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse {url}: {source}")]
    Parse { url: String, source: ParseError },
}

impl FetchError {
    /// Connection failures, timeouts and non-success statuses
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. } | FetchError::Status { .. })
    }

    /// Malformed documents
    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Parse { url, .. } => url,
        }
    }
}

/// Retrieves and classifies documents
///
/// The worker pool is generic over this trait; production code uses
/// [`HttpFetcher`].
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchOutcome> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Overall request timeout; `None` keeps reqwest's default
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use crs_crawler::config::UserAgentConfig;
/// use crs_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), None).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Option<Duration>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}

/// Fetcher backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchOutcome> + Send {
        fetch_url(&self.client, url)
    }
}

/// Fetches a URL and classifies the response body
///
/// # Request Flow
///
/// 1. Send a single GET request
/// 2. Non-2xx status → `FetchError::Status`
/// 3. Read the body; read or connection failure → `FetchError::Transport`
/// 4. Parse the body as XML; failure → `FetchError::Parse`
/// 5. Listing root → `FetchOutcome::Listing`, anything else → `FetchOutcome::Leaf`
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_url(client: &Client, url: &str) -> FetchOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(source) => {
            return FetchOutcome::Error(FetchError::Transport {
                url: url.to_string(),
                source,
            })
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchOutcome::Error(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(source) => {
            return FetchOutcome::Error(FetchError::Transport {
                url: url.to_string(),
                source,
            })
        }
    };

    match classify_document(&body) {
        Ok(classification) => classification.into(),
        Err(source) => FetchOutcome::Error(FetchError::Parse {
            url: url.to_string(),
            source,
        }),
    }
}

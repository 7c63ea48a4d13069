//! Shared crawl state
//!
//! The frontier holds everything workers mutate during a crawl: the FIFO of
//! pending work, the set of URLs already enqueued, the parents whose children
//! are known to be leaves, the collected results, and the number of items a
//! worker has dequeued but not finished. All of it sits behind one mutex; every
//! critical section is short and none spans an await point.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A URL waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// The URL to process
    pub url: String,

    /// The listing this URL was found in; `None` for the seed
    pub parent_url: Option<String>,
}

/// Outcome of [`Frontier::try_dequeue`]
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue {
    /// An item to process. The caller must call [`Frontier::complete`] once done.
    Item(WorkItem),

    /// The queue is empty and no dequeued item is still being processed, so
    /// no more work can ever arrive
    Drained,

    /// The timeout elapsed while other workers still had items in flight
    Idle,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<WorkItem>,
    seen: HashSet<String>,
    skip_parents: HashSet<String>,
    results: Vec<String>,
    in_flight: usize,
}

impl FrontierState {
    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

/// Queue, dedup set, skip set and result list shared by all workers
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still holds usable data
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a URL to the queue unless it was enqueued before
    ///
    /// # Returns
    ///
    /// `true` if the URL was new and is now pending
    pub fn enqueue(&self, url: impl Into<String>, parent_url: Option<&str>) -> bool {
        let url = url.into();
        {
            let mut state = self.lock();
            if !state.seen.insert(url.clone()) {
                return false;
            }
            state.pending.push_back(WorkItem {
                url,
                parent_url: parent_url.map(str::to_string),
            });
        }

        self.notify.notify_waiters();
        true
    }

    /// Takes the next pending item, waiting up to `timeout` for one to appear
    ///
    /// Returns [`Dequeue::Drained`] as soon as the frontier can no longer
    /// receive work, without waiting out the timeout.
    pub async fn try_dequeue(&self, timeout: Duration) -> Dequeue {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the queue so an enqueue between the
            // check and the await still wakes us
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Dequeue::Item(item);
                }
                if state.in_flight == 0 {
                    return Dequeue::Drained;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Dequeue::Idle;
            }
        }
    }

    /// Marks one dequeued item as fully processed
    ///
    /// Children and results produced by the item must be recorded before
    /// this call, otherwise waiting workers may see a drained frontier early.
    pub fn complete(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_drained()
        };

        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Records that the children of `parent_url` are leaves
    pub fn mark_skip(&self, parent_url: &str) {
        self.lock().skip_parents.insert(parent_url.to_string());
    }

    /// Whether children of `parent_url` can be recorded without fetching
    pub fn is_skip(&self, parent_url: &str) -> bool {
        self.lock().skip_parents.contains(parent_url)
    }

    /// Appends a terminal URL to the results
    pub fn record_result(&self, url: impl Into<String>) {
        self.lock().results.push(url.into());
    }

    /// Number of distinct URLs ever enqueued
    pub fn seen_len(&self) -> usize {
        self.lock().seen.len()
    }

    /// Number of items waiting in the queue
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of results recorded so far
    pub fn results_len(&self) -> usize {
        self.lock().results.len()
    }

    /// Moves the collected results out, leaving the list empty
    pub fn take_results(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().results)
    }
}

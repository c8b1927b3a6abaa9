//! Single-worker refresh queue.
//!
//! Names are normalized on the way in and kept in a de-duplicated pending
//! set. The first [`RefreshQueue::enqueue`] on an idle queue spawns the
//! drain task; later calls only add names. The drain task pops the oldest
//! pending name, fetches, shapes, and upserts it, then sleeps the request
//! gap before looking at the set again. Once the set is empty it marks the
//! queue idle under the same lock `enqueue` takes, so a name added at that
//! moment either lands before the idle check or starts a fresh drain task.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use epi_map_covid_models::CountryUpdate;
use epi_map_database::CountryStore;
use epi_map_source::CountryFetcher;
use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::RefreshError;

/// Default delay between upstream requests.
pub const DEFAULT_REQUEST_GAP: Duration = Duration::from_secs(2 * 60);

/// Tunables for the drain task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Sleep after every fetch attempt, successful or not.
    pub gap: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            gap: DEFAULT_REQUEST_GAP,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<String>,
    draining: bool,
}

/// Pending set plus the single drain task that empties it.
pub struct RefreshQueue {
    state: Mutex<QueueState>,
    fetcher: Arc<dyn CountryFetcher>,
    store: Arc<dyn CountryStore>,
    options: RefreshOptions,
    runtime: Handle,
}

impl RefreshQueue {
    /// Creates an idle queue. The drain task will be spawned on the Tokio
    /// runtime this is called from.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::NoRuntime`] if called outside a Tokio runtime.
    pub fn new(
        fetcher: Arc<dyn CountryFetcher>,
        store: Arc<dyn CountryStore>,
        options: RefreshOptions,
    ) -> Result<Arc<Self>, RefreshError> {
        Ok(Self::with_runtime(
            fetcher,
            store,
            options,
            Handle::try_current()?,
        ))
    }

    /// Creates an idle queue whose drain task runs on `runtime`.
    #[must_use]
    pub fn with_runtime(
        fetcher: Arc<dyn CountryFetcher>,
        store: Arc<dyn CountryStore>,
        options: RefreshOptions,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            fetcher,
            store,
            options,
            runtime,
        })
    }

    /// Runtime the drain task (and the scheduler) are spawned on.
    #[must_use]
    pub const fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Store the drain task writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CountryStore> {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Normalizes `names` and adds the ones not already pending.
    ///
    /// Never waits for any fetch: if the queue is idle the drain task is
    /// spawned and this returns immediately. Returns how many names were
    /// newly added.
    pub fn enqueue<I>(self: &Arc<Self>, names: I) -> usize
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let names = epi_map_geography::normalize_all(names);

        let (added, pending, start) = {
            let mut state = self.lock();
            let mut added = 0;
            for name in names {
                if !state.pending.contains(&name) {
                    state.pending.push_back(name);
                    added += 1;
                }
            }
            let start = !state.draining && !state.pending.is_empty();
            if start {
                state.draining = true;
            }
            (added, state.pending.len(), start)
        };

        log::info!("Enqueued {added} countries. Pending size: {pending}");

        if start {
            let queue = Arc::clone(self);
            self.runtime.spawn(async move { queue.drain().await });
        }

        added
    }

    /// Number of names waiting to be fetched.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Snapshot of the pending names, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Returns `true` while a drain task is running.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.lock().draining
    }

    /// Pops the next name, or marks the queue idle when there is none.
    fn next_pending(&self) -> Option<(String, usize)> {
        let mut state = self.lock();
        if let Some(name) = state.pending.pop_front() {
            Some((name, state.pending.len()))
        } else {
            state.draining = false;
            None
        }
    }

    async fn drain(self: Arc<Self>) {
        let _guard = DrainGuard { queue: &self };
        log::debug!("Refresh worker started");

        while let Some((name, remaining)) = self.next_pending() {
            log::info!("Fetching {name}. Remaining after dequeue: {remaining}");
            self.refresh_one(&name).await;

            log::info!("Sleeping {:?} before next fetch...", self.options.gap);
            tokio::time::sleep(self.options.gap).await;
        }

        log::debug!("Refresh worker idle");
    }

    async fn refresh_one(&self, name: &str) {
        let started = Instant::now();

        let update = match self.fetcher.fetch_country(name).await {
            Ok(raw) => {
                let shaped = epi_map_source::shape::shape(name, &raw);
                log::info!(
                    "Updated {name} in {}ms: cases={} deaths={}",
                    started.elapsed().as_millis(),
                    display_total(shaped.cases_total),
                    display_total(shaped.deaths_total),
                );
                CountryUpdate::Fetched { shaped, raw }
            }
            Err(e) => {
                log::warn!(
                    "Failed {name} in {}ms: {e}",
                    started.elapsed().as_millis()
                );
                CountryUpdate::Failed {
                    error: e.to_string(),
                }
            }
        };

        if let Err(e) = self.store.upsert(name, update, Utc::now()).await {
            log::error!("Failed to persist refresh result for {name}: {e}");
        }
    }
}

fn display_total(total: Option<f64>) -> String {
    total.map_or_else(|| "-".to_string(), |t| t.to_string())
}

/// Returns the queue to idle if the drain task unwinds.
struct DrainGuard<'a> {
    queue: &'a RefreshQueue,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("Refresh worker panicked; marking queue idle");
            self.queue.lock().draining = false;
        }
    }
}

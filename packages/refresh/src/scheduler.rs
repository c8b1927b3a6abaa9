//! Periodic refresh of every known country.
//!
//! After a short boot delay the scheduler enqueues all countries the store
//! has a record for, then repeats on a fixed interval. Failures are logged
//! and never stop the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use epi_map_database::DbError;
use tokio::time::{Instant, MissedTickBehavior};

use crate::RefreshQueue;

/// Default interval between refresh-all runs.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Delay before the first refresh-all after [`Scheduler::start`].
pub const INITIAL_DELAY: Duration = Duration::from_secs(5);

/// Shortest accepted interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Re-enqueues known countries on a timer.
pub struct Scheduler {
    queue: Arc<RefreshQueue>,
    started: AtomicBool,
    initial_delay: Duration,
}

impl Scheduler {
    /// Creates a stopped scheduler feeding `queue`.
    #[must_use]
    pub fn new(queue: Arc<RefreshQueue>) -> Arc<Self> {
        Arc::new(Self {
            queue,
            started: AtomicBool::new(false),
            initial_delay: INITIAL_DELAY,
        })
    }

    /// Returns `true` once [`Self::start`] has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Starts the timer loop. Returns `false` (and does nothing) if it was
    /// already started.
    pub fn start(self: &Arc<Self>, interval: Duration) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Scheduler already started");
            return false;
        }

        let interval = interval.max(MIN_INTERVAL);
        let scheduler = Arc::clone(self);
        self.queue.runtime().spawn(async move {
            let started_at = Instant::now();

            tokio::time::sleep(scheduler.initial_delay).await;
            scheduler.tick("Initial").await;

            let mut ticker = tokio::time::interval_at(started_at + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.tick("Scheduled").await;
            }
        });

        log::info!("Scheduler started. Interval: {}ms", interval.as_millis());
        true
    }

    async fn tick(&self, label: &str) {
        if let Err(e) = self.refresh_all_known().await {
            log::error!("{label} refresh of known countries failed: {e}");
        }
    }

    /// Enqueues every country the store has a record for. Returns how many
    /// names were newly added to the pending set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot list its keys.
    pub async fn refresh_all_known(&self) -> Result<usize, DbError> {
        let names = self.queue.store().distinct_keys().await?;
        if names.is_empty() {
            log::debug!("No known countries to refresh");
            return Ok(0);
        }

        log::info!("Enqueuing {} known countries for refresh.", names.len());
        Ok(self.queue.enqueue(names))
    }
}

//! Wave-based fetch scheduling
//!
//! Run lifecycle: schema init, then waves are fetched strictly in range
//! order with at most `wave_size` requests in flight. Each completed wave is
//! handed to a background persistence task and the next wave starts right
//! away. After the last wave the HTTP session is closed and the drain
//! barrier waits for every persistence task.

use crate::drain::PersistenceTasks;
use crate::error::Result;
use crate::fetcher::RecordFetcher;
use crate::models::RunSummary;
use crate::persister;
use crate::store::PeopleStore;
use crate::wave::{IdRange, Wave};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{error, info};

/// Drives fetch waves and spawns their persistence
pub struct WaveScheduler<F, S: ?Sized> {
    fetcher: F,
    store: Arc<S>,
}

impl<F, S> WaveScheduler<F, S>
where
    F: RecordFetcher,
    S: PeopleStore + ?Sized,
{
    pub fn new(fetcher: F, store: Arc<S>) -> Self {
        Self { fetcher, store }
    }

    /// Prepare the store, then fetch and persist the whole range
    pub async fn ingest(self, range: IdRange, wave_size: usize) -> Result<RunSummary> {
        self.store.init_schema().await?;
        self.run(range, wave_size).await
    }

    /// Fetch `range` in waves of `wave_size` and persist every wave
    ///
    /// A failed fetch stops scheduling new waves, but persistence already
    /// started for earlier waves is still drained before the error is
    /// returned.
    pub async fn run(self, range: IdRange, wave_size: usize) -> Result<RunSummary> {
        let waves = range.waves(wave_size)?;

        info!(
            first_id = range.first(),
            last_id = range.last(),
            waves = waves.len(),
            wave_size,
            "Starting ingestion"
        );

        let mut tasks = PersistenceTasks::new();
        let fetched = self.fetch_waves(&waves, &mut tasks).await;

        // The HTTP session is shared by every wave and closed exactly once
        self.fetcher.close().await;
        drop(self.fetcher);

        let spawned = tasks.spawned();
        let drained = tasks.drain().await;

        let (fetched, report) = match (fetched, drained) {
            (Ok(fetched), Ok(report)) => (fetched, report),
            (Ok(_), Err(drain_error)) => return Err(drain_error),
            (Err(fetch_error), Ok(_)) => return Err(fetch_error),
            (Err(fetch_error), Err(drain_error)) => {
                error!(error = %drain_error, "Persistence also failed while aborting");
                return Err(fetch_error);
            },
        };

        let summary = RunSummary {
            waves: spawned,
            fetched,
            inserted: report.inserted(),
            rejected: report.rejected(),
        };

        info!(
            waves = summary.waves,
            fetched = summary.fetched,
            inserted = summary.inserted,
            rejected = summary.rejected,
            "Ingestion finished"
        );

        Ok(summary)
    }

    /// Fetch each wave in order, spawning its persistence as soon as the
    /// whole wave has arrived
    async fn fetch_waves(&self, waves: &[Wave], tasks: &mut PersistenceTasks) -> Result<usize> {
        let mut fetched = 0;

        for wave in waves.iter().copied() {
            info!(
                wave = wave.index(),
                first_id = wave.first(),
                size = wave.len(),
                "Fetching wave"
            );

            // Results come back in dispatch order regardless of completion order
            let results = try_join_all(wave.ids().map(|id| self.fetcher.fetch(id))).await?;
            fetched += results.len();

            let store = Arc::clone(&self.store);
            tasks.spawn(wave.index(), async move {
                persister::persist(store.as_ref(), wave, results).await
            });
        }

        Ok(fetched)
    }
}


//! Background persistence tasks and the barrier that waits for them
//!
//! The scheduler hands every wave to [`PersistenceTasks::spawn`] and moves
//! on. Nothing else tracks those tasks: [`PersistenceTasks::drain`] is the
//! single place where their completion, or failure, is observed.

use crate::error::{IngestError, Result};
use crate::models::WaveReport;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

type UnitOutput = (usize, Result<WaveReport>);

/// Explicit registry of in-flight persistence units
#[derive(Default)]
pub struct PersistenceTasks {
    tasks: JoinSet<UnitOutput>,
    spawned: usize,
}

/// What the drain barrier observed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Successful units, in completion order
    pub completed: Vec<WaveReport>,
}

impl DrainReport {
    pub fn inserted(&self) -> u64 {
        self.completed.iter().map(|r| r.inserted).sum()
    }

    pub fn rejected(&self) -> usize {
        self.completed.iter().map(|r| r.rejected).sum()
    }
}

impl PersistenceTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a unit for `wave` without waiting for it
    ///
    /// A panic inside the unit is captured and reported by [`drain`](Self::drain)
    /// like any other failure.
    pub fn spawn<F>(&mut self, wave: usize, unit: F)
    where
        F: Future<Output = Result<WaveReport>> + Send + 'static,
    {
        self.spawned += 1;
        self.tasks.spawn(async move {
            let outcome = match AssertUnwindSafe(unit).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(IngestError::TaskPanicked {
                    wave,
                    message: panic_message(panic.as_ref()),
                }),
            };
            (wave, outcome)
        });
        debug!(wave, pending = self.tasks.len(), "Persistence task spawned");
    }

    /// Units started so far
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Units not yet collected by the barrier
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every outstanding unit
    ///
    /// Keeps waiting after a failure so no unit is abandoned mid-write, then
    /// returns the first failure along with how many units failed.
    pub async fn drain(mut self) -> Result<DrainReport> {
        info!(pending = self.tasks.len(), "Waiting for persistence tasks");

        let mut report = DrainReport::default();
        let mut failed = 0;
        let mut first_failure = None;

        while let Some(joined) = self.tasks.join_next().await {
            let (wave, outcome) = match joined {
                Ok(output) => output,
                Err(join_error) => {
                    // Only reachable if the runtime cancelled the task
                    failed += 1;
                    error!(error = %join_error, "Persistence task did not finish");
                    first_failure.get_or_insert(IngestError::TaskPanicked {
                        wave: usize::MAX,
                        message: join_error.to_string(),
                    });
                    continue;
                },
            };

            match outcome {
                Ok(wave_report) => {
                    debug!(
                        wave,
                        inserted = wave_report.inserted,
                        rejected = wave_report.rejected,
                        "Persistence task finished"
                    );
                    report.completed.push(wave_report);
                },
                Err(e) => {
                    failed += 1;
                    error!(wave, error = %e, "Persistence task failed");
                    first_failure.get_or_insert(e);
                },
            }
        }

        match first_failure {
            None => Ok(report),
            Some(first) => Err(IngestError::Drain {
                failed,
                first: Box::new(first),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(wave: usize, inserted: u64) -> WaveReport {
        WaveReport {
            wave,
            inserted,
            rejected: 0,
        }
    }

    #[tokio::test]
    async fn test_drain_waits_for_every_unit() {
        let mut tasks = PersistenceTasks::new();
        for wave in 0..4 {
            tasks.spawn(wave, async move {
                // later waves finish first
                tokio::time::sleep(Duration::from_millis(40 - 10 * wave as u64)).await;
                Ok(report(wave, 5))
            });
        }
        assert_eq!(tasks.spawned(), 4);
        assert_eq!(tasks.pending(), 4);

        let drained = tasks.drain().await.unwrap();

        assert_eq!(drained.completed.len(), 4);
        assert_eq!(drained.inserted(), 20);
        let mut waves: Vec<usize> = drained.completed.iter().map(|r| r.wave).collect();
        waves.sort_unstable();
        assert_eq!(waves, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failure_is_reported_after_all_units_finish() {
        let finished = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut tasks = PersistenceTasks::new();

        tasks.spawn(0, async {
            Err(IngestError::persistence(
                0,
                IngestError::Database(sqlx::Error::PoolTimedOut),
            ))
        });
        for wave in 1..3 {
            let finished = finished.clone();
            tasks.spawn(wave, async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(report(wave, 1))
            });
        }

        let err = tasks.drain().await.unwrap_err();

        assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 2);
        match err {
            IngestError::Drain { failed, first } => {
                assert_eq!(failed, 1);
                assert!(matches!(*first, IngestError::Persistence { wave: 0, .. }));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_unit_is_surfaced() {
        let mut tasks = PersistenceTasks::new();
        tasks.spawn(7, async {
            if true {
                panic!("store exploded");
            }
            Ok(report(7, 0))
        });

        match tasks.drain().await.unwrap_err() {
            IngestError::Drain { failed, first } => {
                assert_eq!(failed, 1);
                match *first {
                    IngestError::TaskPanicked { wave, message } => {
                        assert_eq!(wave, 7);
                        assert_eq!(message, "store exploded");
                    },
                    other => panic!("unexpected error: {other}"),
                }
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_drain() {
        let drained = PersistenceTasks::new().drain().await.unwrap();
        assert!(drained.completed.is_empty());
    }
}

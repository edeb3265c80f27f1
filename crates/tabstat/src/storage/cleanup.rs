//! Removal of stale uploads, once or on a fixed interval.

use serde::Serialize;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::error::Result;

use super::store::DatasetStore;

/// Result of one sweep over the upload directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    /// File names that were deleted.
    pub removed: Vec<String>,
    /// Stale files that could not be deleted.
    pub failed: usize,
}

/// Delete every stored dataset whose modification time is more than
/// `max_age` before `now`, dropping cached frames for them.
///
/// Other files in the upload directory are never touched.
pub fn sweep_stale_files(
    store: &DatasetStore,
    max_age: Duration,
    now: SystemTime,
) -> Result<SweepOutcome> {
    let mut outcome = SweepOutcome::default();

    for id in store.list_known_dataset_ids()? {
        let path = store.upload_dir().join(&id);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(file = %id, error = %e, "Upload vanished before sweep");
                continue;
            }
        };

        let age = now
            .duration_since(metadata.modified()?)
            .unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                store.invalidate(&id);
                debug!(file = %id, age_secs = age.as_secs(), "Removed stale upload");
                outcome.removed.push(id);
            }
            Err(e) => {
                warn!(file = %id, error = %e, "Failed to remove stale upload");
                outcome.failed += 1;
            }
        }
    }

    outcome.removed.sort();
    if !outcome.removed.is_empty() || outcome.failed > 0 {
        info!(
            removed = outcome.removed.len(),
            failed = outcome.failed,
            "Cleanup sweep finished"
        );
    }
    Ok(outcome)
}

/// Totals accumulated by a [`CleanupWorker`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub sweeps: u64,
    pub files_removed: u64,
    pub errors: u64,
}

/// Background task repeating [`sweep_stale_files`] until shutdown.
pub struct CleanupWorker {
    store: Arc<DatasetStore>,
    max_age: Duration,
    every: Duration,
    shutdown: watch::Receiver<bool>,
    stats: CleanupStats,
}

impl CleanupWorker {
    pub fn new(
        store: Arc<DatasetStore>,
        max_age: Duration,
        every: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            max_age,
            every,
            shutdown,
            stats: CleanupStats::default(),
        }
    }

    /// Sweep on every tick until the shutdown flag turns true.
    ///
    /// The first sweep runs immediately.
    pub async fn run(mut self) -> CleanupStats {
        info!(
            interval_secs = self.every.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "Cleanup worker started"
        );
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutdown signal received, stopping cleanup worker");
                        break;
                    }
                }
            }
        }

        info!(
            sweeps = self.stats.sweeps,
            removed = self.stats.files_removed,
            errors = self.stats.errors,
            "Cleanup worker stopped"
        );
        self.stats
    }

    async fn sweep(&mut self) {
        let store = Arc::clone(&self.store);
        let max_age = self.max_age;
        let result = tokio::task::spawn_blocking(move || {
            sweep_stale_files(&store, max_age, SystemTime::now())
        })
        .await;

        self.stats.sweeps += 1;
        match result {
            Ok(Ok(outcome)) => {
                self.stats.files_removed += outcome.removed.len() as u64;
                self.stats.errors += outcome.failed as u64;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Cleanup sweep failed");
                self.stats.errors += 1;
            }
            Err(e) => {
                error!(error = %e, "Cleanup sweep task panicked");
                self.stats.errors += 1;
            }
        }
    }
}

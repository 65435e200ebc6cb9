//! Background retention sweep.
//!
//! Runs on a fixed interval for the lifetime of the process. Each run deletes
//! expired catalog rows, then the backing object of every deleted row.
//! The sweeper shares nothing with request handlers except the database and
//! the content store; a download racing a sweep may see a 404.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::catalog::FileCatalog;
use super::storage::ContentStore;
use crate::chat::ChatLog;
use crate::db::Database;
use crate::Result;

/// Default interval between sweeps (1 hour).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Default retention window (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Catalog rows deleted.
    pub files_deleted: usize,
    /// Deleted rows whose backing object was already gone.
    pub content_missing: usize,
    /// Deleted rows whose backing object could not be removed.
    pub content_errors: usize,
    /// Chat messages deleted.
    pub chat_deleted: u64,
}

/// Periodic cleanup of expired files and chat messages.
pub struct RetentionSweeper {
    db: Arc<Database>,
    store: ContentStore,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    /// Create a sweeper with the default hourly interval.
    pub fn new(db: Arc<Database>, store: ContentStore, max_age: Duration) -> Self {
        Self {
            db,
            store,
            max_age,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Set the interval between sweeps.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run a single sweep.
    ///
    /// Fails only when the catalog itself cannot be queried. Per-record
    /// content failures are counted and logged.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        let expired = FileCatalog::new(self.db.pool())
            .delete_expired(self.max_age)
            .await?;
        report.files_deleted = expired.len();

        for record in &expired {
            match self.store.delete(&record.stored_path).await {
                Ok(true) => {
                    debug!(file_id = record.id, stored_path = %record.stored_path, "Expired file removed");
                }
                Ok(false) => {
                    report.content_missing += 1;
                    warn!(file_id = record.id, stored_path = %record.stored_path, "Expired file had no backing object");
                }
                Err(e) => {
                    report.content_errors += 1;
                    warn!(file_id = record.id, stored_path = %record.stored_path, error = %e, "Failed to remove expired file");
                }
            }
        }

        match ChatLog::new(self.db.pool()).delete_expired(self.max_age).await {
            Ok(count) => report.chat_deleted = count,
            Err(e) => warn!(error = %e, "Failed to clean up expired chat messages"),
        }

        if report.files_deleted > 0 {
            let pruned = self.store.prune_empty_dirs().await;
            debug!(pruned, "Pruned empty batch directories");
        }

        Ok(report)
    }

    /// Run the sweep loop forever.
    ///
    /// The first sweep happens immediately, so files that expired while the
    /// process was down are purged at startup.
    pub async fn run(&self) {
        info!(
            "Retention sweeper started (max age: {}s, interval: {}s)",
            self.max_age.as_secs(),
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            match self.sweep_once().await {
                Ok(report) if report.files_deleted > 0 || report.chat_deleted > 0 => {
                    info!(
                        files_deleted = report.files_deleted,
                        content_missing = report.content_missing,
                        content_errors = report.content_errors,
                        chat_deleted = report.chat_deleted,
                        "Retention sweep complete"
                    );
                }
                Ok(_) => debug!("Nothing expired"),
                Err(e) => error!(error = %e, "Retention sweep failed"),
            }
        }
    }

    /// Spawn the sweep loop on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}

//! Tombstone Purge Background Task
//!
//! Each cycle runs two sweeps on a blocking thread:
//!
//! - purge up to `batch_size` tombstones older than the store's retention window
//! - re-stamp up to `restamp_limit` contacts still flagged `stamp_pending`
//!
//! The task runs until the watch channel carries `true` or its sender is
//! dropped.

use crate::ContactStore;
use chrono::Utc;
use rolodex_core::{OpContext, PurgeConfig, RolodexResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// METRICS
// ============================================================================

/// Counters for purge task activity.
#[derive(Debug, Default)]
pub struct PurgeMetrics {
    /// Tombstones permanently removed since startup
    pub tombstones_purged: AtomicU64,

    /// Contacts re-stamped by the reconciliation sweep
    pub contacts_restamped: AtomicU64,

    /// Completed purge cycles
    pub purge_cycles: AtomicU64,

    /// Errors encountered during purge cycles
    pub purge_errors: AtomicU64,
}

impl PurgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> PurgeSnapshot {
        PurgeSnapshot {
            tombstones_purged: self.tombstones_purged.load(Ordering::Relaxed),
            contacts_restamped: self.contacts_restamped.load(Ordering::Relaxed),
            purge_cycles: self.purge_cycles.load(Ordering::Relaxed),
            purge_errors: self.purge_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of purge metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSnapshot {
    pub tombstones_purged: u64,
    pub contacts_restamped: u64,
    pub purge_cycles: u64,
    pub purge_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Periodically purge expired tombstones and repair missing stamps.
///
/// # Returns
///
/// Metrics collected during the task's lifetime
pub async fn tombstone_purge_task(
    store: Arc<ContactStore>,
    config: PurgeConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<PurgeMetrics> {
    let metrics = Arc::new(PurgeMetrics::new());

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid purge configuration; task not started");
        metrics.purge_errors.fetch_add(1, Ordering::Relaxed);
        return metrics;
    }

    let mut purge_interval = interval(config.check_interval);
    purge_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        check_interval_ms = config.check_interval.as_millis() as u64,
        retention_days = store.config().tombstone_retention_days,
        batch_size = config.batch_size,
        "Tombstone purge task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Tombstone purge task shutting down");
                    break;
                }
            }

            _ = purge_interval.tick() => {
                purge_cycle(&store, &config, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        tombstones_purged = snapshot.tombstones_purged,
        contacts_restamped = snapshot.contacts_restamped,
        purge_cycles = snapshot.purge_cycles,
        purge_errors = snapshot.purge_errors,
        "Tombstone purge task completed"
    );

    metrics
}

/// Perform one purge and re-stamp cycle.
async fn purge_cycle(store: &Arc<ContactStore>, config: &PurgeConfig, metrics: &PurgeMetrics) {
    metrics.purge_cycles.fetch_add(1, Ordering::Relaxed);

    let store = Arc::clone(store);
    let batch_size = config.batch_size;
    let restamp_limit = config.restamp_limit;

    let joined = tokio::task::spawn_blocking(move || -> (RolodexResult<usize>, RolodexResult<usize>) {
        let ctx = OpContext::background();
        let cutoff_ms = store.tombstone_cutoff_ms(Utc::now());
        let purged = store.purge_tombstones_before(&ctx, cutoff_ms, batch_size);
        let restamped = store.restamp_pending(&ctx, restamp_limit);
        (purged, restamped)
    })
    .await;

    let (purged, restamped) = match joined {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(error = %e, "Purge cycle panicked or was cancelled");
            metrics.purge_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let purged = match purged {
        Ok(count) => {
            metrics
                .tombstones_purged
                .fetch_add(count as u64, Ordering::Relaxed);
            count
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to purge tombstones");
            metrics.purge_errors.fetch_add(1, Ordering::Relaxed);
            0
        }
    };

    let restamped = match restamped {
        Ok(count) => {
            metrics
                .contacts_restamped
                .fetch_add(count as u64, Ordering::Relaxed);
            count
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to re-stamp pending contacts");
            metrics.purge_errors.fetch_add(1, Ordering::Relaxed);
            0
        }
    };

    if config.log_purges || purged > 0 || restamped > 0 {
        tracing::info!(purged, restamped, "Purge cycle completed");
    } else {
        tracing::trace!("Purge cycle completed with nothing to do");
    }
}

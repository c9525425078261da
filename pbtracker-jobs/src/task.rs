//! Scheduled Reconciliation Task
//!
//! Runs [`ReconcileEngine::reconcile_orphans`] on a fixed interval until a
//! shutdown signal arrives. An aborted pass is logged and counted; the next
//! tick simply tries again.
//!
//! # Example
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let config = ReconcileConfig::from_env()?;
//! let engine = ReconcileEngine::new(catalog, runs, caches, config.clone());
//!
//! let handle = tokio::spawn(reconcile_task(engine, config, shutdown_rx));
//!
//! // Later
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pbtracker_core::constants::DEFAULT_RECONCILE_INTERVAL_SECS;
use pbtracker_core::ReconcileConfig;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::reconcile::{ReconcileEngine, ReconcileOutcome};

// ============================================================================
// METRICS
// ============================================================================

/// Counters accumulated across reconciliation passes.
#[derive(Debug, Default)]
pub struct ReconcileMetrics {
    /// Passes that ran to completion
    pub passes: AtomicU64,

    /// Passes aborted by an error
    pub aborted_passes: AtomicU64,

    pub categories_removed: AtomicU64,
    pub games_removed: AtomicU64,

    /// Categories left in place because their run lookup was exhausted
    pub deferred_categories: AtomicU64,

    pub inconsistencies: AtomicU64,
}

impl ReconcileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed pass into the counters.
    pub fn record(&self, outcome: &ReconcileOutcome) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.categories_removed
            .fetch_add(outcome.categories_removed(), Ordering::Relaxed);
        self.games_removed
            .fetch_add(outcome.deleted_games.len() as u64, Ordering::Relaxed);
        self.deferred_categories
            .fetch_add(outcome.deferred.len() as u64, Ordering::Relaxed);
        self.inconsistencies
            .fetch_add(outcome.inconsistencies, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReconcileSnapshot {
        ReconcileSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            aborted_passes: self.aborted_passes.load(Ordering::Relaxed),
            categories_removed: self.categories_removed.load(Ordering::Relaxed),
            games_removed: self.games_removed.load(Ordering::Relaxed),
            deferred_categories: self.deferred_categories.load(Ordering::Relaxed),
            inconsistencies: self.inconsistencies.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ReconcileMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSnapshot {
    pub passes: u64,
    pub aborted_passes: u64,
    pub categories_removed: u64,
    pub games_removed: u64,
    pub deferred_categories: u64,
    pub inconsistencies: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run reconciliation passes every `config.check_interval` until shutdown.
///
/// The first pass runs immediately. Returns the metrics collected over the
/// task's lifetime.
pub async fn reconcile_task(
    engine: ReconcileEngine,
    config: ReconcileConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<ReconcileMetrics> {
    let metrics = Arc::new(ReconcileMetrics::new());

    let period = if config.check_interval.is_zero() {
        tracing::warn!(
            default_secs = DEFAULT_RECONCILE_INTERVAL_SECS,
            "Zero reconcile interval is invalid, using default"
        );
        Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS)
    } else {
        config.check_interval
    };
    let mut pass_interval = interval(period);
    pass_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        check_interval_secs = period.as_secs(),
        override_games = config.override_games.len(),
        "Reconcile task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Reconcile task shutting down");
                    break;
                }
            }

            _ = pass_interval.tick() => {
                run_pass(&engine, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        passes = snapshot.passes,
        aborted_passes = snapshot.aborted_passes,
        categories_removed = snapshot.categories_removed,
        games_removed = snapshot.games_removed,
        "Reconcile task completed"
    );

    metrics
}

/// Run one pass and record it.
pub async fn run_pass(engine: &ReconcileEngine, metrics: &ReconcileMetrics) {
    match engine.reconcile_orphans().await {
        Ok(outcome) => metrics.record(&outcome),
        Err(e) => {
            metrics.aborted_passes.fetch_add(1, Ordering::Relaxed);
            if e.is_resource_exhausted() {
                tracing::warn!(error = %e, "Reconciliation pass aborted, will retry next interval");
            } else {
                tracing::error!(error = %e, "Reconciliation pass failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbtracker_core::{CategoryInfo, Game};
    use pbtracker_storage::{
        InMemoryCacheBackend, InMemoryCatalogStore, InMemoryRunIndex, ProjectionCaches,
    };

    fn engine_with_orphan() -> (ReconcileEngine, Arc<InMemoryCacheBackend>) {
        let store = Arc::new(InMemoryCatalogStore::new());
        let runs = Arc::new(InMemoryRunIndex::new());
        let backend = Arc::new(InMemoryCacheBackend::new());
        store
            .seed(Game::new("Orphaned", vec![CategoryInfo::new("Any%")]))
            .unwrap();
        let engine = ReconcileEngine::new(
            store,
            runs,
            ProjectionCaches::from_backend(backend.clone()),
            ReconcileConfig::default(),
        );
        (engine, backend)
    }

    #[test]
    fn test_metrics_record() {
        let metrics = ReconcileMetrics::new();
        let mut outcome = ReconcileOutcome::default();
        outcome
            .removed_categories
            .insert("A".to_string(), vec!["x".to_string(), "y".to_string()]);
        outcome.deleted_games.push("A".to_string());
        outcome.deferred.push(("B".to_string(), "z".to_string()));
        outcome.inconsistencies = 2;

        metrics.record(&outcome);

        assert_eq!(
            metrics.snapshot(),
            ReconcileSnapshot {
                passes: 1,
                aborted_passes: 0,
                categories_removed: 2,
                games_removed: 1,
                deferred_categories: 1,
                inconsistencies: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_run_pass_counts_abort() {
        let (engine, backend) = engine_with_orphan();
        backend.fail_category_index_load(true);
        let metrics = ReconcileMetrics::new();

        run_pass(&engine, &metrics).await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.passes, 0);
        assert_eq!(snapshot.aborted_passes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_until_shutdown() {
        let (engine, _backend) = engine_with_orphan();
        let config = ReconcileConfig::default().with_interval(Duration::from_secs(60));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(reconcile_task(engine, config, shutdown_rx));

        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.passes, 3);
        assert_eq!(snapshot.games_removed, 1);
        assert_eq!(snapshot.categories_removed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_falls_back_to_default() {
        let (engine, _backend) = engine_with_orphan();
        let config = ReconcileConfig::default().with_interval(Duration::ZERO);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(reconcile_task(engine, config, shutdown_rx));

        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();

        // Only the immediate first tick fires within the default interval.
        assert_eq!(metrics.snapshot().passes, 1);
    }
}

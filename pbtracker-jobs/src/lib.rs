//! PB Tracker Jobs - Catalog Consistency
//!
//! Background and request-driven jobs that keep the catalog store and its
//! derived caches in agreement:
//!
//! - [`ReconcileEngine`]: reclaims categories and games with no remaining runs
//! - [`BestKnownTimeUpdater`]: sets or clears a category's best known time
//! - [`reconcile_task`]: runs reconciliation passes on an interval

pub mod bkt;
pub mod reconcile;
pub mod task;
pub mod telemetry;

pub use bkt::{validate_best_known_time, BestKnownTimeUpdater};
pub use reconcile::{ReconcileEngine, ReconcileOutcome};
pub use task::{reconcile_task, run_pass, ReconcileMetrics, ReconcileSnapshot};
pub use telemetry::{init_tracing, TelemetryConfig, TelemetryInitError};

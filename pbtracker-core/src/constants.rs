//! Constants for PB Tracker
//!
//! Centralized default values for configuration and background jobs.

// ============================================================================
// RECONCILIATION
// ============================================================================

/// Games whose base-category flags are ignored during cleanup.
///
/// Their base category lists were seeded incorrectly and must be allowed to
/// shrink like any other category list.
pub const DEFAULT_OVERRIDE_GAMES: [&str; 4] = [
    "Luigi's Mansion",
    "Super Mario Bros.: The Lost Levels",
    "The Legend of Zelda: A Link to the Past",
    "Mega Man 9",
];

/// Run index lookups only need to know whether at least one run exists.
pub const DEFAULT_RUN_LOOKUP_LIMIT: u32 = 1;

/// Default interval between scheduled reconciliation passes (24 hours)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 86_400;

// ============================================================================
// TELEMETRY
// ============================================================================

/// Default `EnvFilter` directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

pub const ENV_OVERRIDE_GAMES: &str = "PBTRACKER_OVERRIDE_GAMES";
pub const ENV_RUN_LOOKUP_LIMIT: &str = "PBTRACKER_RUN_LOOKUP_LIMIT";
pub const ENV_RECONCILE_INTERVAL_SECS: &str = "PBTRACKER_RECONCILE_INTERVAL_SECS";
pub const ENV_LOG_REMOVALS: &str = "PBTRACKER_LOG_REMOVALS";
pub const ENV_LOG_JSON: &str = "PBTRACKER_LOG_JSON";

//! PB Tracker Core - Catalog Types
//!
//! Pure data structures shared by the storage collaborators and the background
//! jobs: the game catalog with its embedded categories, the shapes of the
//! derived caches, time/date string handling, errors and configuration.
//! This crate contains no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

pub mod config;
pub mod constants;
pub mod entities;
pub mod error;
pub mod timefmt;

pub use config::ReconcileConfig;
pub use entities::*;
pub use error::{ConfigError, PbError, PbResult, StorageError, ValidationError};
pub use timefmt::{datestr_to_date, seconds_to_timestr, timestr_to_seconds};

static NON_CODE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid code regex"));

/// Normalise a game or category name into its URL/cache code.
///
/// Lowercases the name and collapses every run of non-alphanumeric
/// characters into a single `-`. Leading and trailing dashes are dropped.
pub fn code(name: &str) -> String {
    let lowered = name.to_lowercase();
    NON_CODE_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

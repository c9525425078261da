//! Reconciliation configuration.
//!
//! Loaded from environment variables or a TOML file. The override game set is
//! injected here rather than named in the cleanup logic.

use crate::constants::{
    DEFAULT_OVERRIDE_GAMES, DEFAULT_RECONCILE_INTERVAL_SECS, DEFAULT_RUN_LOOKUP_LIMIT,
    ENV_LOG_REMOVALS, ENV_OVERRIDE_GAMES, ENV_RECONCILE_INTERVAL_SECS, ENV_RUN_LOOKUP_LIMIT,
};
use crate::ConfigError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Configuration for the orphan reconciliation pass and its scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Games whose `is_base_category` flags are ignored.
    pub override_games: BTreeSet<String>,

    /// Limit passed to run index lookups (default: 1)
    pub run_lookup_limit: u32,

    /// How often the background task runs a pass (default: 24 hours)
    pub check_interval: Duration,

    /// Whether to log every removed category (default: true)
    pub log_removals: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            override_games: DEFAULT_OVERRIDE_GAMES.iter().map(|g| g.to_string()).collect(),
            run_lookup_limit: DEFAULT_RUN_LOOKUP_LIMIT,
            check_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            log_removals: true,
        }
    }
}

/// On-disk shape of [`ReconcileConfig`]. Missing keys fall back to defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReconcileConfigFile {
    override_games: Option<Vec<String>>,
    run_lookup_limit: Option<u32>,
    check_interval_secs: Option<u64>,
    log_removals: Option<bool>,
}

impl ReconcileConfig {
    /// Create ReconcileConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `PBTRACKER_OVERRIDE_GAMES`: `|`-separated game names (default: the four seeded titles)
    /// - `PBTRACKER_RUN_LOOKUP_LIMIT`: run index lookup limit (default: 1)
    /// - `PBTRACKER_RECONCILE_INTERVAL_SECS`: pass interval (default: 86400)
    /// - `PBTRACKER_LOG_REMOVALS`: whether to log removals (default: true)
    ///
    /// Unparseable values fall back to the default; parsed values that fail
    /// [`validate`](Self::validate) are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let override_games = std::env::var(ENV_OVERRIDE_GAMES)
            .ok()
            .map(|s| parse_game_list(&s))
            .unwrap_or(defaults.override_games);

        let run_lookup_limit = std::env::var(ENV_RUN_LOOKUP_LIMIT)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.run_lookup_limit);

        let check_interval = std::env::var(ENV_RECONCILE_INTERVAL_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.check_interval);

        let log_removals = std::env::var(ENV_LOG_REMOVALS)
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.log_removals);

        let config = Self {
            override_games,
            run_lookup_limit,
            check_interval,
            log_removals,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ReconcileConfigFile = toml::from_str(contents)?;
        let defaults = Self::default();
        let config = Self {
            override_games: file
                .override_games
                .map(|games| games.into_iter().collect())
                .unwrap_or(defaults.override_games),
            run_lookup_limit: file.run_lookup_limit.unwrap_or(defaults.run_lookup_limit),
            check_interval: file
                .check_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.check_interval),
            log_removals: file.log_removals.unwrap_or(defaults.log_removals),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_lookup_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "run_lookup_limit",
                reason: "must be > 0".to_string(),
            });
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "check_interval_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.override_games.iter().any(|g| g.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "override_games",
                reason: "game names must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Replace the override game set.
    pub fn with_override_games<I, S>(mut self, games: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.override_games = games.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Whether base-category protection is ignored for this game.
    pub fn is_override_game(&self, game: &str) -> bool {
        self.override_games.contains(game)
    }
}

fn parse_game_list(raw: &str) -> BTreeSet<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

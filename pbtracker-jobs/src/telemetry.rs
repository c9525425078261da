//! Tracing subscriber setup.

use pbtracker_core::constants::{DEFAULT_LOG_FILTER, ENV_LOG_JSON};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Read `PBTRACKER_LOG_JSON` (`true`/`1` enables JSON output).
    pub fn from_env() -> Self {
        let json = std::env::var(ENV_LOG_JSON)
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false);
        Self {
            json,
            ..Self::default()
        }
    }
}

/// Error returned when a global subscriber is already installed.
#[derive(Debug, Error)]
#[error("Failed to init subscriber: {0}")]
pub struct TelemetryInitError(String);

/// Install the global tracing subscriber.
///
/// Call once at startup. `RUST_LOG` overrides `config.filter`.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| TelemetryInitError(e.to_string()))?;

    tracing::info!(json = config.json, filter = %config.filter, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.filter, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = TelemetryConfig::default();
        // The first call may lose to another test in this binary.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}

//! Error types for PB Tracker operations

use crate::{BestKnownTimeInput, BktField, EntityKind};
use std::collections::BTreeMap;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Transient capacity failure reported by the store, the run index or a cache.
    #[error("Resource exhausted during {operation}: {reason}")]
    ResourceExhausted { operation: String, reason: String },

    #[error("Entity not found: {entity:?} with key {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("Storage backend error: {reason}")]
    Backend { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn resource_exhausted(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

/// Rejected best-known-time input.
///
/// Carries one message per offending field together with everything the user
/// typed, so the caller can redisplay the form without losing input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.summary())]
pub struct ValidationError {
    pub errors: BTreeMap<BktField, String>,
    pub input: BestKnownTimeInput,
}

impl ValidationError {
    pub fn new(input: BestKnownTimeInput) -> Self {
        Self {
            errors: BTreeMap::new(),
            input,
        }
    }

    pub fn push(&mut self, field: BktField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message recorded for a field, if any.
    pub fn message(&self, field: BktField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// `field: message` pairs joined with `; `.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for all PB Tracker errors.
#[derive(Debug, Error)]
pub enum PbError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl PbError {
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, PbError::Storage(StorageError::ResourceExhausted { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PbError::Storage(StorageError::NotFound { .. }))
    }
}

/// Result type alias for PB Tracker operations.
pub type PbResult<T> = Result<T, PbError>;

// =============================================================================
// TESTS
// =============================================================================

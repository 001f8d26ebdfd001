//! Core error types for habitflow-core.
//!
//! Integrity errors are fatal to the call that hit them. Configuration gaps
//! and advisory conditions never surface here: they are recovered locally or
//! attached to results as metadata.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Stored data violates an invariant the derivations depend on
    #[error("Data integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A requested record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Malformed records that cannot be placed on the calendar.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// A value that must be a `YYYY-MM-DD` day key is not one
    #[error("Invalid day key '{value}'")]
    InvalidDayKey { value: String },

    /// A legacy day log carries a date that is not a valid day key
    #[error("Legacy day log for habit '{habit_id}' has invalid date '{date}'")]
    InvalidLegacyDate { habit_id: String, date: String },

    /// An entry has no usable day key and its timestamp cannot be parsed
    #[error("Entry '{entry_id}' has no day key and an unparseable timestamp '{timestamp}'")]
    UnresolvableEntryDay { entry_id: String, timestamp: String },
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// Store is locked
    #[error("Store is locked")]
    Locked,

    /// A stored column could not be decoded
    #[error("Corrupt column '{column}': {message}")]
    CorruptColumn { column: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No timezone was configured or supplied
    #[error("No timezone configured; pass --tz or set 'timezone'")]
    MissingTimezone,

    /// Home/config directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

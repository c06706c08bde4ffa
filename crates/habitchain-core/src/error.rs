//! Core error types for habitchain-core.
//!
//! `HabitError` is the engine-level taxonomy every mutating operation
//! reports. Storage and configuration failures have their own enums and
//! are folded into `CoreError` for callers that touch both.

use std::path::PathBuf;
use thiserror::Error;

use crate::habit::HabitId;

/// Core error type for habitchain-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Engine-level rejection
    #[error(transparent)]
    Habit(#[from] HabitError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections raised by the commitment, accomplishment and settlement engines.
///
/// Every variant means the call had no effect on the ledger.
#[derive(Error, Debug)]
pub enum HabitError {
    #[error("habit {0} not found")]
    NotFound(HabitId),

    #[error("access denied: {caller} is not the owner of habit {habit_id}")]
    AccessDenied { habit_id: HabitId, caller: String },

    #[error("period of habit {habit_id} has not started yet (starts {period_start})")]
    PeriodNotStarted {
        habit_id: HabitId,
        period_start: chrono::DateTime<chrono::Utc>,
    },

    #[error("period of habit {habit_id} expired at {period_end}")]
    PeriodExpired {
        habit_id: HabitId,
        period_end: chrono::DateTime<chrono::Utc>,
    },

    #[error("habit {habit_id} chain is {chain}, commitment requires {required}")]
    ChainCommitmentNotAccomplished {
        habit_id: HabitId,
        chain: u32,
        required: u32,
    },

    #[error("stake of habit {0} was already claimed")]
    AlreadyClaimed(HabitId),

    #[error("commitment of habit {0} is not broken")]
    CommitmentNotBroken(HabitId),

    #[error("invalid commitment '{field}': {message}")]
    InvalidCommitment { field: &'static str, message: String },

    #[error("transfer of habit {habit_id} stake to {recipient} failed: {source}")]
    TransferFailure {
        habit_id: HabitId,
        recipient: String,
        #[source]
        source: TransferError,
    },

    #[error("habit {habit_id} record is corrupt: {message}")]
    CorruptRecord { habit_id: HabitId, message: String },

    #[error("lock on habit ledger poisoned")]
    LockPoisoned,
}

/// Low-level failure reported by a [`crate::transfer::TransferSink`].
///
/// Never surfaces on its own past a claim; it is wrapped in
/// [`HabitError::TransferFailure`].
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("transfer backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Stored habit could not be encoded or decoded
    #[error("Failed to encode habit record: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(#[source] std::io::Error),
}

/// Validation errors for user-supplied values.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid address '{value}': {message}")]
    InvalidAddress { value: String, message: String },

    #[error("Invalid timeframe '{value}': {message}")]
    InvalidTimeframe { value: String, message: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for HabitError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        HabitError::LockPoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

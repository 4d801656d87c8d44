//! Storage Layer
//!
//! Persists users, sensor readings and alerts behind the [`Storage`] trait.
//! Two backends implement it: [`DatabaseStorage`] (SQLite via sqlx) and
//! [`MemoryStorage`] (process-local, bounded retention). [`open`] picks one
//! from a [`StorageConfig`] at startup.

mod backend;
mod config;
mod database;
mod memory;
mod model;

pub use self::config::StorageConfig;
pub use backend::{open, BackendKind, SharedStorage, Storage, DEFAULT_RECENT_LIMIT};
pub use database::DatabaseStorage;
pub use memory::MemoryStorage;
pub use model::{Alert, NewAlert, NewSensorReading, NewUser, SensorReading, Severity, User};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique column (user id or username) already holds the value
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    /// The database could not be reached
    #[error("Database unavailable: {0}")]
    Connectivity(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Lock error: {0}")]
    LockPoisoned(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::ConstraintViolation(db.message().to_string())
            }
            sqlx::Error::Io(e) => StorageError::Connectivity(e.to_string()),
            sqlx::Error::Tls(e) => StorageError::Connectivity(e.to_string()),
            sqlx::Error::PoolTimedOut => {
                StorageError::Connectivity("timed out acquiring a connection".to_string())
            }
            sqlx::Error::PoolClosed => {
                StorageError::Connectivity("connection pool is closed".to_string())
            }
            sqlx::Error::WorkerCrashed => {
                StorageError::Connectivity("database worker crashed".to_string())
            }
            sqlx::Error::Configuration(e) => StorageError::Configuration(e.to_string()),
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}

impl From<::config::ConfigError> for StorageError {
    fn from(err: ::config::ConfigError) -> Self {
        StorageError::Configuration(err.to_string())
    }
}

impl From<ring_buffer::RingBufferError> for StorageError {
    fn from(err: ring_buffer::RingBufferError) -> Self {
        StorageError::Configuration(err.to_string())
    }
}

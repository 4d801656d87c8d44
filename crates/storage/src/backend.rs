//! Storage interface and backend selection

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::{
    Alert, DatabaseStorage, MemoryStorage, NewAlert, NewSensorReading, NewUser, SensorReading,
    StorageConfig, StorageError, User,
};

/// Default row count for recent-record queries
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Which backend a [`Storage`] instance is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Database,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Database => "database",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence operations shared by every backend.
///
/// Lookups return `Ok(None)` when nothing matches. Recent queries return at
/// most `limit` records, newest first; a `limit` above the stored count
/// returns everything.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Create a user with a fresh id; fails with `ConstraintViolation` if the
    /// username is taken
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn create_sensor_reading(
        &self,
        reading: NewSensorReading,
    ) -> Result<SensorReading, StorageError>;

    async fn get_recent_sensor_readings(
        &self,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StorageError>;

    async fn get_latest_sensor_reading(&self) -> Result<Option<SensorReading>, StorageError>;

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StorageError>;

    async fn get_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError>;

    fn backend(&self) -> BackendKind;
}

pub(crate) fn record_created(backend: BackendKind, kind: &'static str) {
    metrics::counter!(
        "storage_records_created_total",
        "backend" => backend.as_str(),
        "kind" => kind
    )
    .increment(1);
}

pub(crate) fn record_evicted(backend: BackendKind, kind: &'static str) {
    metrics::counter!(
        "storage_records_evicted_total",
        "backend" => backend.as_str(),
        "kind" => kind
    )
    .increment(1);
}

/// Storage handle passed to callers
pub type SharedStorage = Arc<dyn Storage>;

/// Instantiate the backend selected by `config`.
///
/// A configured `database_url` binds the database backend to it; otherwise
/// the in-memory backend is used. The choice is final for the returned handle.
pub async fn open(config: &StorageConfig) -> Result<SharedStorage, StorageError> {
    config.validate()?;

    let storage: SharedStorage = match config.database_url.as_deref() {
        Some(url) => {
            let db = DatabaseStorage::connect(url, config).await?;
            if config.init_schema {
                db.create_schema().await?;
            }
            Arc::new(db)
        }
        None => {
            info!("DATABASE_URL not set. Running with in-memory storage.");
            Arc::new(MemoryStorage::from_config(config)?)
        }
    };

    info!(backend = %storage.backend(), "Storage ready");
    Ok(storage)
}

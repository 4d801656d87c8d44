//! Storage configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::StorageError;

/// Environment variable that selects the database backend
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Prefix for the remaining `SENSOR_STORAGE_*` settings
pub const ENV_PREFIX: &str = "SENSOR_STORAGE";

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Connection string; `None` runs with in-memory storage. Only read from
    /// `DATABASE_URL`.
    #[serde(skip_deserializing)]
    pub database_url: Option<String>,
    /// Pool size for the database backend
    pub max_connections: u32,
    /// Pool acquire timeout (seconds)
    pub acquire_timeout_secs: u64,
    /// In-memory retention cap for sensor readings
    pub reading_capacity: usize,
    /// In-memory retention cap for alerts
    pub alert_capacity: usize,
    /// Create missing tables on connect
    pub init_schema: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            acquire_timeout_secs: 30,
            reading_capacity: 1000,
            alert_capacity: 500,
            init_schema: false,
        }
    }
}

impl StorageConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, StorageError> {
        Self::load(None)
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, StorageError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, StorageError> {
        let database_url = match &vars {
            Some(vars) => vars.get(DATABASE_URL_VAR).cloned(),
            None => std::env::var(DATABASE_URL_VAR).ok(),
        }
        .filter(|url| !url.trim().is_empty());

        let env = ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true)
            .source(vars);

        let mut config: StorageConfig = ::config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.database_url = database_url;

        config.validate()?;
        Ok(config)
    }

    /// In-memory config with custom retention caps
    pub fn in_memory(reading_capacity: usize, alert_capacity: usize) -> Self {
        Self {
            reading_capacity,
            alert_capacity,
            ..Default::default()
        }
    }

    /// Database config for `url`
    pub fn database(url: impl Into<String>) -> Self {
        Self {
            database_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Whether the database backend is selected
    pub fn has_database(&self) -> bool {
        self.database_url.is_some()
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Reject values no backend can run with
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.reading_capacity == 0 {
            return Err(StorageError::Configuration(
                "reading_capacity must be at least 1".to_string(),
            ));
        }
        if self.alert_capacity == 0 {
            return Err(StorageError::Configuration(
                "alert_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(StorageError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

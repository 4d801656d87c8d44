//! Database Backend
//!
//! SQLite persistence through a sqlx connection pool. Ids and timestamps for
//! readings and alerts are assigned by the database.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{record_created, BackendKind, Storage};
use crate::{
    Alert, NewAlert, NewSensorReading, NewUser, SensorReading, StorageConfig, StorageError, User,
};

/// Insert-time default: RFC 3339 UTC with milliseconds, so text order is time order
const NOW: &str = "(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))";

fn schema() -> [String; 3] {
    [
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )"
        .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS sensor_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                speed REAL NOT NULL,
                acceleration REAL NOT NULL,
                braking REAL NOT NULL,
                tilt REAL NOT NULL,
                rotation_rate REAL NOT NULL,
                is_crash BOOLEAN NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL DEFAULT {NOW}
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                alert_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT {NOW}
            )"
        ),
    ]
}

/// Storage backed by a SQLite database
pub struct DatabaseStorage {
    pool: SqlitePool,
}

impl DatabaseStorage {
    /// Connect a pool to `url` using the pool settings in `config`
    pub async fn connect(url: &str, config: &StorageConfig) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Connected database storage"
        );
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the users, sensor_readings and alerts tables if missing
    pub async fn create_schema(&self) -> Result<(), StorageError> {
        for statement in schema() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        debug!("Database schema ready");
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password) VALUES (?, ?, ?)
             RETURNING id, username, password",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user.username)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from);

        match result {
            Ok(created) => {
                record_created(BackendKind::Database, "user");
                debug!("Created user {}", created.id);
                Ok(created)
            }
            Err(StorageError::ConstraintViolation(msg)) => {
                warn!(username = %user.username, "Rejected duplicate username");
                Err(StorageError::ConstraintViolation(msg))
            }
            Err(e) => Err(e),
        }
    }

    async fn create_sensor_reading(
        &self,
        reading: NewSensorReading,
    ) -> Result<SensorReading, StorageError> {
        let record = sqlx::query_as::<_, SensorReading>(
            "INSERT INTO sensor_readings
                 (speed, acceleration, braking, tilt, rotation_rate, is_crash)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, speed, acceleration, braking, tilt, rotation_rate, is_crash, timestamp",
        )
        .bind(reading.speed)
        .bind(reading.acceleration)
        .bind(reading.braking)
        .bind(reading.tilt)
        .bind(reading.rotation_rate)
        .bind(reading.is_crash.unwrap_or(false))
        .fetch_one(&self.pool)
        .await?;

        record_created(BackendKind::Database, "sensor_reading");
        debug!("Inserted sensor reading with ID {}", record.id);
        Ok(record)
    }

    async fn get_recent_sensor_readings(
        &self,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let readings = sqlx::query_as::<_, SensorReading>(
            "SELECT id, speed, acceleration, braking, tilt, rotation_rate, is_crash, timestamp
             FROM sensor_readings
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(readings)
    }

    async fn get_latest_sensor_reading(&self) -> Result<Option<SensorReading>, StorageError> {
        let reading = sqlx::query_as::<_, SensorReading>(
            "SELECT id, speed, acceleration, braking, tilt, rotation_rate, is_crash, timestamp
             FROM sensor_readings
             ORDER BY timestamp DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(reading)
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StorageError> {
        let record = sqlx::query_as::<_, Alert>(
            "INSERT INTO alerts (alert_type, severity, message)
             VALUES (?, ?, ?)
             RETURNING id, alert_type, severity, message, timestamp",
        )
        .bind(&alert.alert_type)
        .bind(alert.severity)
        .bind(&alert.message)
        .fetch_one(&self.pool)
        .await?;

        record_created(BackendKind::Database, "alert");
        debug!("Inserted alert with ID {}", record.id);
        Ok(record)
    }

    async fn get_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let alerts = sqlx::query_as::<_, Alert>(
            "SELECT id, alert_type, severity, message, timestamp
             FROM alerts
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Database
    }
}

/// SQLite binds integers as i64
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

//! In-Memory Backend

use async_trait::async_trait;
use chrono::Utc;
use ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{record_created, record_evicted, BackendKind, Storage};
use crate::{
    Alert, NewAlert, NewSensorReading, NewUser, SensorReading, StorageConfig, StorageError, User,
};

/// Bounded record log with its id counter
struct Retained<T> {
    entries: RingBuffer<T>,
    next_id: i64,
}

impl<T> Retained<T> {
    fn new(capacity: usize) -> Result<Self, StorageError> {
        Ok(Self {
            entries: RingBuffer::new(capacity)?,
            next_id: 1,
        })
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Process-local storage with fixed retention caps.
///
/// Nothing survives a restart. Sensor readings and alerts beyond their caps
/// are evicted oldest first.
pub struct MemoryStorage {
    users: Mutex<HashMap<String, User>>,
    readings: Mutex<Retained<SensorReading>>,
    alerts: Mutex<Retained<Alert>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::LockPoisoned(e.to_string()))
}

impl MemoryStorage {
    /// Create a store with custom retention caps
    pub fn with_capacity(
        reading_capacity: usize,
        alert_capacity: usize,
    ) -> Result<Self, StorageError> {
        info!(
            reading_capacity,
            alert_capacity, "Creating in-memory storage"
        );
        Ok(Self {
            users: Mutex::new(HashMap::new()),
            readings: Mutex::new(Retained::new(reading_capacity)?),
            alerts: Mutex::new(Retained::new(alert_capacity)?),
        })
    }

    /// Create a store with the caps from `config`
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::with_capacity(config.reading_capacity, config.alert_capacity)
    }

    /// Number of users stored
    pub fn user_count(&self) -> usize {
        self.users.lock().map(|u| u.len()).unwrap_or(0)
    }

    /// Number of sensor readings currently retained
    pub fn sensor_count(&self) -> usize {
        self.readings.lock().map(|r| r.entries.len()).unwrap_or(0)
    }

    /// Number of alerts currently retained
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.entries.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        Ok(lock(&self.users)?.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut users = lock(&self.users)?;

        if users.values().any(|u| u.username == user.username) {
            warn!(username = %user.username, "Rejected duplicate username");
            return Err(StorageError::ConstraintViolation(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: user.username,
            password: user.password,
        };
        users.insert(user.id.clone(), user.clone());
        record_created(BackendKind::Memory, "user");
        debug!("Created user {}", user.id);

        Ok(user)
    }

    async fn create_sensor_reading(
        &self,
        reading: NewSensorReading,
    ) -> Result<SensorReading, StorageError> {
        let mut readings = lock(&self.readings)?;

        let record = SensorReading {
            id: readings.allocate_id(),
            speed: reading.speed,
            acceleration: reading.acceleration,
            braking: reading.braking,
            tilt: reading.tilt,
            rotation_rate: reading.rotation_rate,
            is_crash: reading.is_crash.unwrap_or(false),
            timestamp: Utc::now(),
        };

        record_created(BackendKind::Memory, "sensor_reading");
        if readings.entries.push(record.clone()).is_some() {
            record_evicted(BackendKind::Memory, "sensor_reading");
        }
        debug!("Inserted sensor reading with ID {}", record.id);

        Ok(record)
    }

    async fn get_recent_sensor_readings(
        &self,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StorageError> {
        Ok(lock(&self.readings)?.entries.read_last(limit))
    }

    async fn get_latest_sensor_reading(&self) -> Result<Option<SensorReading>, StorageError> {
        Ok(lock(&self.readings)?.entries.latest().cloned())
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StorageError> {
        let mut alerts = lock(&self.alerts)?;

        let record = Alert {
            id: alerts.allocate_id(),
            alert_type: alert.alert_type,
            severity: alert.severity,
            message: alert.message,
            timestamp: Utc::now(),
        };

        record_created(BackendKind::Memory, "alert");
        if alerts.entries.push(record.clone()).is_some() {
            record_evicted(BackendKind::Memory, "alert");
        }
        debug!("Inserted alert with ID {}", record.id);

        Ok(record)
    }

    async fn get_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        Ok(lock(&self.alerts)?.entries.read_last(limit))
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Severity, DEFAULT_RECENT_LIMIT};

    fn storage() -> MemoryStorage {
        MemoryStorage::from_config(&StorageConfig::default()).unwrap()
    }

    fn reading(speed: f64) -> NewSensorReading {
        NewSensorReading {
            speed,
            ..Default::default()
        }
    }

    fn alert(message: &str) -> NewAlert {
        NewAlert {
            alert_type: "crash".to_string(),
            severity: Severity::High,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let storage = storage();

        let first = storage.create_sensor_reading(reading(1.0)).await.unwrap();
        let second = storage.create_sensor_reading(reading(2.0)).await.unwrap();
        let alert = storage.create_alert(alert("first")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(alert.id, 1);
    }

    #[tokio::test]
    async fn test_reading_retention_cap() {
        let storage = storage();

        for i in 0..1234 {
            storage.create_sensor_reading(reading(i as f64)).await.unwrap();
        }

        assert_eq!(storage.sensor_count(), 1000);
        let recent = storage.get_recent_sensor_readings(1000).await.unwrap();
        assert_eq!(recent.len(), 1000);
        assert_eq!(recent[0].id, 1234);
        assert_eq!(recent[999].id, 235);
        assert!(recent.windows(2).all(|w| w[0].id == w[1].id + 1));
    }

    #[tokio::test]
    async fn test_alert_retention_cap() {
        let storage = storage();

        for i in 0..600 {
            storage.create_alert(alert(&format!("alert {}", i))).await.unwrap();
        }

        assert_eq!(storage.alert_count(), 500);
        let recent = storage.get_recent_alerts(DEFAULT_RECENT_LIMIT).await.unwrap();
        assert_eq!(recent.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent[0].message, "alert 599");

        let all = storage.get_recent_alerts(10_000).await.unwrap();
        assert_eq!(all.last().map(|a| a.id), Some(101));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let storage = storage();
        let input = NewUser {
            username: "driver".to_string(),
            password: "secret".to_string(),
        };

        storage.create_user(input.clone()).await.unwrap();
        let err = storage.create_user(input).await.unwrap_err();

        assert!(matches!(err, StorageError::ConstraintViolation(_)));
        assert_eq!(storage.user_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_inserts_keep_ids_in_retention_order() {
        let storage = std::sync::Arc::new(storage());

        let mut handles = Vec::new();
        for task in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..300 {
                    storage
                        .create_sensor_reading(reading((task * 1000 + i) as f64))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let recent = storage.get_recent_sensor_readings(1000).await.unwrap();
        assert_eq!(recent.len(), 1000);
        assert_eq!(recent[0].id, 2400);
        assert_eq!(recent[999].id, 1401);
        assert!(recent.windows(2).all(|w| w[0].id == w[1].id + 1));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            MemoryStorage::with_capacity(0, 5),
            Err(StorageError::Configuration(_))
        ));
    }
}

//! Stored Records
//!
//! Records are created once and never updated. `New*` types carry the
//! caller-supplied fields; ids and timestamps are assigned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Opaque credential, stored as given
    pub password: String,
}

/// Signup input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Motion sample with crash classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub speed: f64,
    pub acceleration: f64,
    pub braking: f64,
    pub tilt: f64,
    pub rotation_rate: f64,
    pub is_crash: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSensorReading {
    pub speed: f64,
    pub acceleration: f64,
    pub braking: f64,
    pub tilt: f64,
    pub rotation_rate: f64,
    /// Treated as `false` when absent
    #[serde(default)]
    pub is_crash: Option<bool>,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_input_without_crash_flag() {
        let input: NewSensorReading = serde_json::from_str(
            r#"{"speed":42.0,"acceleration":1.5,"braking":0.0,"tilt":3.0,"rotationRate":0.2}"#,
        )
        .unwrap();

        assert_eq!(input.is_crash, None);
        assert_eq!(input.rotation_rate, 0.2);
    }

    #[test]
    fn test_severity_wire_format() {
        let alert: NewAlert = serde_json::from_str(
            r#"{"alertType":"crash","severity":"critical","message":"Impact detected"}"#,
        )
        .unwrap();

        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert_eq!(Severity::Medium.to_string(), "medium");
    }
}

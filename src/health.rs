//! Storage health probe
//!
//! The probe checks connectivity to the document store and reports basic
//! statistics. It never returns an error: any failure is folded into a
//! `DOWN` report carrying the failure message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single component as reported by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentStatus {
    Up,
    Down,
}

impl ComponentStatus {
    pub fn is_up(self) -> bool {
        self == ComponentStatus::Up
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Up => write!(f, "UP"),
            ComponentStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Detailed storage health report.
///
/// Contains internals (database name, object counts, raw error text) and
/// must only be served on the admin listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageHealth {
    pub status: ComponentStatus,
    pub database: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StorageHealth {
    pub fn up(database: impl Into<String>, collections: Option<i64>, objects: Option<i64>) -> Self {
        Self {
            status: ComponentStatus::Up,
            database: database.into(),
            message: "Connected".to_string(),
            collections,
            objects,
            error: None,
        }
    }

    pub fn down(database: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Down,
            database: database.into(),
            message: "Disconnected".to_string(),
            collections: None,
            objects: None,
            error: Some(error.into()),
        }
    }
}

/// Connectivity check against the document store
#[async_trait]
pub trait StorageProbe: Send + Sync {
    async fn check_health(&self) -> StorageHealth;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_report_shape() {
        let report = StorageHealth::up("vision", Some(5), Some(1000));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "UP");
        assert_eq!(json["database"], "vision");
        assert_eq!(json["message"], "Connected");
        assert_eq!(json["collections"], 5);
        assert_eq!(json["objects"], 1000);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_down_report_shape() {
        let report = StorageHealth::down("vision", "Connection timeout");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "DOWN");
        assert_eq!(json["message"], "Disconnected");
        assert_eq!(json["error"], "Connection timeout");
        assert!(json.get("collections").is_none());
        assert!(!report.status.is_up());
    }
}

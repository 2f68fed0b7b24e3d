//! Health check aggregation
//!
//! Combines the service run state and the storage probe into one report
//! for the admin listener, along with readiness and liveness probes.

use crate::health::{StorageHealth, StorageProbe};
use crate::metrics::MetricsCollector;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Everything a health check needs to look at
#[derive(Clone)]
pub struct HealthContext {
    pub service_name: String,
    pub probe: Arc<dyn StorageProbe>,
    pub metrics: Arc<MetricsCollector>,
    pub quota_limit: Option<usize>,
    running: Arc<RwLock<bool>>,
}

impl HealthContext {
    pub fn new(
        service_name: impl Into<String>,
        probe: Arc<dyn StorageProbe>,
        metrics: Arc<MetricsCollector>,
        quota_limit: Option<usize>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            probe,
            metrics,
            quota_limit,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.running.write().await = running;
    }
}

/// Detailed health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Raw storage probe report
    pub storage: StorageHealth,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub ranges_created: u64,
    pub ranges_updated: u64,
    pub ranges_deleted: u64,
    /// Per-user range limit, absent when quota enforcement is off
    pub quota_limit: Option<usize>,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(ctx: &HealthContext) -> Self {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(ctx).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        let (storage_check, storage) = Self::check_storage(ctx).await;
        if storage_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(storage_check);

        let ranges = ctx.metrics.ranges();
        let stats = ServiceStats {
            ranges_created: ranges.ranges_created_total.get(),
            ranges_updated: ranges.ranges_updated_total.get(),
            ranges_deleted: ranges.ranges_deleted_total.get(),
            quota_limit: ctx.quota_limit,
        };

        HealthCheck {
            status: overall_status,
            service: ctx.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            storage,
            stats,
        }
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(ctx: &HealthContext) -> HealthStatus {
        if ctx.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness check - running and able to reach storage
    pub async fn readiness_check(ctx: &HealthContext) -> HealthStatus {
        if !ctx.is_running().await {
            return HealthStatus::Unhealthy;
        }

        Self::check_storage(ctx).await.0.status
    }

    async fn check_service_running(ctx: &HealthContext) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if ctx.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_storage(ctx: &HealthContext) -> (ComponentCheck, StorageHealth) {
        let start = Instant::now();
        let report = ctx.probe.check_health().await;
        ctx.metrics.update_storage_status(report.status.is_up());

        let (status, message) = if report.status.is_up() {
            debug!("Storage '{}' is up", report.database);
            (HealthStatus::Healthy, None)
        } else {
            warn!(
                "Storage '{}' is down: {}",
                report.database,
                report.error.as_deref().unwrap_or("unknown error")
            );
            (HealthStatus::Unhealthy, report.error.clone())
        };

        let check = ComponentCheck {
            name: "storage".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (check, report)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

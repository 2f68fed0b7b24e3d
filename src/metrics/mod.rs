//! Metrics and monitoring for the range service
//!
//! Prometheus metrics collection plus the admin listener that exposes
//! them alongside detailed health, readiness and liveness endpoints.

pub mod collector;
pub mod health;

pub use collector::{MetricsCollector, MetricsTimer, RangeMetrics, ServiceMetrics};
pub use health::{encode_metrics, HealthServer, HealthServerConfig};

use std::sync::Arc;
use tokio::net::TcpListener;

/// Metrics collector paired with the admin listener that serves it
#[derive(Clone)]
pub struct MetricsService {
    collector: Arc<MetricsCollector>,
    health_server: Arc<HealthServer>,
}

impl MetricsService {
    pub fn new(collector: Arc<MetricsCollector>, health_server: Arc<HealthServer>) -> Self {
        Self {
            collector,
            health_server,
        }
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn health_server(&self) -> Arc<HealthServer> {
        self.health_server.clone()
    }

    /// Bind the admin listener
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        self.health_server.bind().await
    }

    /// Serve the admin endpoints until stopped
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        self.health_server.serve(listener).await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.health_server.stop().await
    }
}

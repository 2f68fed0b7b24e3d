//! Admin listener: detailed health checks and Prometheus metrics
//!
//! Served on its own port so storage internals never reach the public API.

use crate::metrics::collector::MetricsCollector;
use crate::service::health::{HealthCheck, HealthContext, HealthStatus};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    /// Port to bind the health server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Shared state for the health server
#[derive(Clone)]
pub struct HealthServerState {
    pub metrics_collector: Arc<MetricsCollector>,
    pub health: Option<HealthContext>,
}

/// Health server that provides HTTP endpoints for monitoring
pub struct HealthServer {
    config: HealthServerConfig,
    state: HealthServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    pub fn new(config: HealthServerConfig, metrics_collector: Arc<MetricsCollector>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: HealthServerState {
                metrics_collector,
                health: None,
            },
            shutdown_tx,
        }
    }

    /// Attach the components the health endpoints report on
    pub fn with_health_context(mut self, health: HealthContext) -> Self {
        self.state.health = Some(health);
        self
    }

    /// Bind the listener without serving yet
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid health server address")?;

        TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind health server on {}", addr))
    }

    /// Serve on an already bound listener until stopped
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Health server listening on http://{}", addr);
        }

        let app = self.create_router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Health server shutdown signal received");
            })
            .await?;

        info!("Health server stopped");
        Ok(())
    }

    /// Create the Axum router with all health endpoints
    pub fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/alive", get(alive_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping health server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to health server: {}", e);
        }

        Ok(())
    }
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let service = state
        .health
        .as_ref()
        .map(|h| h.service_name.clone())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    Json(json!({
        "service": service,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/ready", "/alive", "/metrics"]
    }))
}

/// Detailed health report, 503 when any component is down
async fn health_handler(State(state): State<HealthServerState>) -> Response {
    debug!("Detailed health check requested");

    match &state.health {
        Some(ctx) => {
            let health = HealthCheck::check(ctx).await;
            let status = match health.status {
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, Json(health)).into_response()
        }
        None => not_initialized().into_response(),
    }
}

async fn ready_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match &state.health {
        Some(ctx) => match HealthCheck::readiness_check(ctx).await {
            HealthStatus::Healthy => (StatusCode::OK, "Ready"),
            HealthStatus::Degraded => (StatusCode::OK, "Degraded but ready"),
            HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        },
        None => (StatusCode::SERVICE_UNAVAILABLE, "Service not initialized"),
    }
}

async fn alive_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Liveness check requested");

    match &state.health {
        Some(ctx) => match HealthCheck::liveness_check(ctx).await {
            HealthStatus::Healthy => (StatusCode::OK, "Alive"),
            _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
        },
        None => (StatusCode::SERVICE_UNAVAILABLE, "Service not initialized"),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<HealthServerState>) -> Response {
    debug!("Metrics endpoint requested");

    match encode_metrics(&state.metrics_collector) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

fn not_initialized() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "unhealthy",
            "error": "Service not initialized"
        })),
    )
}

/// Render every registered metric in Prometheus text format
pub fn encode_metrics(metrics_collector: &MetricsCollector) -> Result<String> {
    metrics_collector.refresh_uptime();

    let metric_families = metrics_collector.registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;

    debug!("Serving {} metric families", metric_families.len());
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{StorageHealth, StorageProbe};
    use crate::store::InMemoryRangeStore;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt; // for oneshot

    struct DownProbe;

    #[async_trait]
    impl StorageProbe for DownProbe {
        async fn check_health(&self) -> StorageHealth {
            StorageHealth::down("vision", "server selection timeout")
        }
    }

    fn collector() -> Arc<MetricsCollector> {
        Arc::new(MetricsCollector::new().expect("Failed to create collector"))
    }

    async fn running_context(probe: Arc<dyn StorageProbe>) -> HealthContext {
        let ctx = HealthContext::new("vision", probe, collector(), Some(10));
        ctx.set_running(true).await;
        ctx
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let server = HealthServer::new(HealthServerConfig::default(), collector());
        let response = get(server.create_router(), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = collector();
        metrics.record_range_created();
        metrics.record_rejection("quota_exceeded");

        let server = HealthServer::new(HealthServerConfig::default(), metrics);
        let response = get(server.create_router(), "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));
    }

    #[tokio::test]
    async fn test_encoded_metrics_use_service_prefix() {
        let metrics = collector();
        metrics.record_range_created();

        let text = encode_metrics(&metrics).unwrap();
        assert!(text.contains("range_vault_ranges_created_total 1"));
        assert!(text.contains("range_vault_uptime_seconds"));
    }

    #[tokio::test]
    async fn test_endpoints_without_health_context() {
        let server = HealthServer::new(HealthServerConfig::default(), collector());
        let app = server.create_router();

        for uri in ["/health", "/ready", "/alive"] {
            let response = get(app.clone(), uri).await;
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_detailed_health_with_memory_store() {
        let ctx = running_context(Arc::new(InMemoryRangeStore::new())).await;
        let server =
            HealthServer::new(HealthServerConfig::default(), collector()).with_health_context(ctx);
        let app = server.create_router();

        assert_eq!(get(app.clone(), "/health").await.status(), StatusCode::OK);
        assert_eq!(get(app.clone(), "/ready").await.status(), StatusCode::OK);
        assert_eq!(get(app, "/alive").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_storage_down_fails_health_and_readiness() {
        let ctx = running_context(Arc::new(DownProbe)).await;
        let server =
            HealthServer::new(HealthServerConfig::default(), collector()).with_health_context(ctx);
        let app = server.create_router();

        assert_eq!(
            get(app.clone(), "/health").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get(app.clone(), "/ready").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(get(app, "/alive").await.status(), StatusCode::OK);
    }

    #[test]
    fn test_health_server_config() {
        let config = HealthServerConfig::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[tokio::test]
    async fn test_404_handling() {
        let server = HealthServer::new(HealthServerConfig::default(), collector());
        let response = get(server.create_router(), "/nonexistent").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

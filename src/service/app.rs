//! Main application state and service coordination
//!
//! Builds the range store selected by configuration, wires it into the
//! range service, and runs the public and admin listeners until shutdown.

use crate::config::{validate_config, AppConfig, StorageBackend};
use crate::health::StorageProbe;
use crate::http::{api_routes, ApiState};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::service::health::HealthContext;
use crate::service::ranges::RangeService;
use crate::store::{InMemoryRangeStore, RangeStore};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage connection error: {message}")]
    StorageConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    ranges: RangeService,

    probe: Arc<dyn StorageProbe>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    health: HealthContext,

    /// Listener task handles
    background_tasks: Vec<JoinHandle<()>>,

    api_shutdown: broadcast::Sender<()>,
}

impl AppState {
    /// Initialize the application, connecting to the configured store
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing range service");
        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let (store, probe) = Self::initialize_store(&config).await?;
        Self::with_store(config, store, probe)
    }

    /// Initialize the application on top of an existing store
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn RangeStore>,
        probe: Arc<dyn StorageProbe>,
    ) -> Result<Self, ServiceError> {
        let collector = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let ranges = RangeService::new(store, config.range_quota()).with_metrics(collector.clone());
        match ranges.quota_limit() {
            Some(limit) => info!("Range quota enforced: {} per user", limit),
            None => warn!("Range quota enforcement is disabled"),
        }

        let health = HealthContext::new(
            config.service.name.clone(),
            probe.clone(),
            collector.clone(),
            ranges.quota_limit(),
        );
        let metrics_service = Self::initialize_metrics(&config, collector, health.clone());
        let (api_shutdown, _) = broadcast::channel(1);

        Ok(Self {
            config,
            ranges,
            probe,
            metrics_service,
            health,
            background_tasks: Vec::new(),
            api_shutdown,
        })
    }

    /// Bind both listeners and start serving
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting range service");

        self.start_metrics_service().await?;
        self.start_api_server().await?;

        self.health.set_running(true).await;
        info!("✅ Range service started successfully");
        Ok(())
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of range service");
        self.health.set_running(false).await;

        if let Err(e) = self.api_shutdown.send(()) {
            warn!("Failed to send shutdown signal to API server: {}", e);
        }
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        }

        let mut failed = 0;
        for handle in self.background_tasks.drain(..) {
            if let Err(e) = handle.await {
                error!("Listener task ended abnormally: {}", e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(ServiceError::BackgroundTask {
                message: format!("{} listener task(s) did not stop cleanly", failed),
            });
        }

        info!("✅ Range service shutdown completed");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn ranges(&self) -> &RangeService {
        &self.ranges
    }

    pub fn probe(&self) -> Arc<dyn StorageProbe> {
        self.probe.clone()
    }

    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    pub fn health_context(&self) -> HealthContext {
        self.health.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.health.is_running().await
    }

    /// Public router for the range API
    pub fn api_router(&self) -> Router {
        api_routes(ApiState::new(
            self.ranges.clone(),
            self.probe.clone(),
            self.config.service.name.clone(),
        ))
    }

    async fn initialize_store(
        config: &AppConfig,
    ) -> Result<(Arc<dyn RangeStore>, Arc<dyn StorageProbe>), ServiceError> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory range store");
                let store = Arc::new(InMemoryRangeStore::new());
                Ok((store.clone(), store))
            }
            StorageBackend::Mongo => Self::initialize_mongo(config).await,
        }
    }

    #[cfg(feature = "mongo")]
    async fn initialize_mongo(
        config: &AppConfig,
    ) -> Result<(Arc<dyn RangeStore>, Arc<dyn StorageProbe>), ServiceError> {
        use crate::store::{MongoRangeStore, MongoStoreConfig};

        info!(
            "Connecting to MongoDB database '{}'",
            config.storage.database
        );
        let mongo_config = MongoStoreConfig {
            uri: config.storage.uri.clone(),
            database: config.storage.database.clone(),
            app_name: config.service.name.clone(),
            connect_timeout: config.storage_connect_timeout(),
            server_selection_timeout: config.storage_server_selection_timeout(),
            max_retries: config.storage.max_retry_attempts,
            retry_delay: config.storage_retry_delay(),
        };

        let store = Arc::new(MongoRangeStore::connect(mongo_config).await.map_err(|e| {
            ServiceError::StorageConnection {
                message: e.to_string(),
            }
        })?);
        Ok((store.clone(), store))
    }

    #[cfg(not(feature = "mongo"))]
    async fn initialize_mongo(
        _config: &AppConfig,
    ) -> Result<(Arc<dyn RangeStore>, Arc<dyn StorageProbe>), ServiceError> {
        Err(ServiceError::Configuration {
            message: "MongoDB storage requires the `mongo` feature".to_string(),
        })
    }

    fn initialize_metrics(
        config: &AppConfig,
        collector: Arc<MetricsCollector>,
        health: HealthContext,
    ) -> Arc<MetricsService> {
        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };
        let health_server =
            Arc::new(HealthServer::new(health_config, collector.clone()).with_health_context(health));
        Arc::new(MetricsService::new(collector, health_server))
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        let listener =
            self.metrics_service
                .bind()
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to start admin listener: {:#}", e),
                })?;

        let metrics_service = self.metrics_service.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.serve(listener).await {
                error!("Metrics service failed: {}", e);
            }
        });
        self.background_tasks.push(handle);

        info!(
            "✅ Admin endpoints started on port {}",
            self.config.service.health_port
        );
        Ok(())
    }

    async fn start_api_server(&mut self) -> Result<(), ServiceError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.http_port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to bind API server on {}: {}", addr, e),
            })?;

        let app = self.api_router();
        let mut shutdown_rx = self.api_shutdown.subscribe();
        let handle = tokio::spawn(async move {
            info!("Range API listening on http://{}", addr);
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    info!("API server shutdown signal received");
                })
                .await;
            match result {
                Ok(()) => info!("API server stopped"),
                Err(e) => error!("API server failed: {}", e),
            }
        });
        self.background_tasks.push(handle);
        Ok(())
    }
}

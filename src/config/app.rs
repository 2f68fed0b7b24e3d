//! Main application configuration
//!
//! Defaults, environment variable loading, TOML file loading and
//! validation for the range service.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub ranges: RangeSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name reported by the public health endpoint
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the public range API
    pub http_port: u16,
    /// Port for the admin listener (detailed health, metrics)
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Which range store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mongo,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            other => Err(anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Mongo => write!(f, "mongo"),
        }
    }
}

/// Document store connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// MongoDB connection string
    pub uri: String,
    /// Database holding the `ranges` collection
    pub database: String,
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,
    /// Server selection timeout in seconds
    pub server_selection_timeout_seconds: u64,
    /// Maximum connection retry attempts at startup
    pub max_retry_attempts: u32,
    /// Initial retry delay in milliseconds, doubled on each attempt
    pub retry_delay_ms: u64,
}

/// Range quota policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeSettings {
    pub max_ranges_per_user: usize,
    pub enforce_quota: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "vision".to_string(),
            log_level: "info".to_string(),
            http_port: 8080,
            health_port: 8081,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: if cfg!(feature = "mongo") {
                StorageBackend::Mongo
            } else {
                StorageBackend::Memory
            },
            uri: "mongodb://localhost:27017".to_string(),
            database: "vision".to_string(),
            connect_timeout_seconds: 10,
            server_selection_timeout_seconds: 10,
            max_retry_attempts: 5,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for RangeSettings {
    fn default() -> Self {
        Self {
            max_ranges_per_user: 10,
            enforce_quota: true,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still
    /// override values from the file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections and keys take their defaults
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = parse_var("HTTP_PORT", &port)?;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            self.service.health_port = parse_var("HEALTH_PORT", &port)?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Storage settings
        if let Ok(backend) = env::var("STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Ok(uri) = env::var("MONGODB_URI") {
            self.storage.uri = uri;
        }
        if let Ok(database) = env::var("MONGODB_DATABASE") {
            self.storage.database = database;
        }
        if let Ok(timeout) = env::var("STORAGE_CONNECT_TIMEOUT_SECONDS") {
            self.storage.connect_timeout_seconds =
                parse_var("STORAGE_CONNECT_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Ok(retries) = env::var("STORAGE_MAX_RETRY_ATTEMPTS") {
            self.storage.max_retry_attempts = parse_var("STORAGE_MAX_RETRY_ATTEMPTS", &retries)?;
        }
        if let Ok(delay) = env::var("STORAGE_RETRY_DELAY_MS") {
            self.storage.retry_delay_ms = parse_var("STORAGE_RETRY_DELAY_MS", &delay)?;
        }

        // Quota settings
        if let Ok(limit) = env::var("MAX_RANGES_PER_USER") {
            self.ranges.max_ranges_per_user = parse_var("MAX_RANGES_PER_USER", &limit)?;
        }
        if let Ok(enforce) = env::var("ENFORCE_RANGE_QUOTA") {
            self.ranges.enforce_quota = parse_var("ENFORCE_RANGE_QUOTA", &enforce)?;
        }

        Ok(())
    }

    /// Active per-user quota, `None` when enforcement is off
    pub fn range_quota(&self) -> Option<usize> {
        self.ranges
            .enforce_quota
            .then_some(self.ranges.max_ranges_per_user)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    pub fn storage_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.connect_timeout_seconds)
    }

    pub fn storage_server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.server_selection_timeout_seconds)
    }

    pub fn storage_retry_delay(&self) -> Duration {
        Duration::from_millis(self.storage.retry_delay_ms)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.trim().is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.http_port == config.service.health_port {
        return Err(anyhow!(
            "HTTP port and health port must differ (both {})",
            config.service.http_port
        ));
    }

    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate storage settings
    if config.storage.backend == StorageBackend::Mongo {
        if !cfg!(feature = "mongo") {
            return Err(anyhow!(
                "MongoDB storage requested but the `mongo` feature is not enabled"
            ));
        }
        if config.storage.uri.is_empty() {
            return Err(anyhow!("MongoDB URI cannot be empty"));
        }
        if config.storage.database.is_empty() {
            return Err(anyhow!("MongoDB database name cannot be empty"));
        }
        if config.storage.connect_timeout_seconds == 0 {
            return Err(anyhow!("Storage connection timeout must be greater than 0"));
        }
        if config.storage.server_selection_timeout_seconds == 0 {
            return Err(anyhow!(
                "Storage server selection timeout must be greater than 0"
            ));
        }
    }

    if config.ranges.enforce_quota && config.ranges.max_ranges_per_user == 0 {
        return Err(anyhow!("Max ranges per user must be greater than 0"));
    }

    Ok(())
}

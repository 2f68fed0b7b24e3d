//! Main entry point for the Range Vault service
//!
//! Loads configuration, connects the range store and runs the public and
//! admin listeners until a shutdown signal arrives.

use anyhow::Result;
use clap::Parser;
use range_vault::config::{validate_config, AppConfig, StorageBackend};
use range_vault::service::{AppState, HealthCheck, HealthContext, HealthStatus};
use std::path::PathBuf;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Range Vault - storage service for poker ranges
#[derive(Parser)]
#[command(
    name = "range-vault",
    version,
    about = "Stores and serves poker ranges per user",
    long_about = "Range Vault stores named poker ranges (hand buckets mapped to weighted \
                 fold/call/raise/check actions) for each user, enforces a per-user range \
                 quota, and reports the health of its MongoDB storage."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override public API port")]
    http_port: Option<u16>,

    /// Health port override
    #[arg(long, value_name = "PORT", help = "Override admin (health/metrics) port")]
    health_port: Option<u16>,

    /// Storage backend override
    #[arg(long, value_name = "BACKEND", help = "Storage backend (memory, mongo)")]
    storage: Option<StorageBackend>,

    /// MongoDB URI override
    #[arg(long, value_name = "URI", help = "Override MongoDB connection string")]
    mongodb_uri: Option<String>,

    /// Disable the per-user range quota
    #[arg(long, help = "Allow users to create any number of ranges")]
    no_quota: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Probe storage once and exit with the matching status code
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = app_state.health_context();
    ctx.set_running(true).await;
    let health = HealthCheck::check(&ctx).await;

    println!("Health Check: {}", health.status);
    println!("  Storage: {} ({})", health.storage.status, health.storage.database);
    if let Some(objects) = health.storage.objects {
        println!("  Objects: {}", objects);
    }
    if let Some(err) = &health.storage.error {
        println!("  Error: {}", err);
    }

    if health.status == HealthStatus::Healthy {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Run periodic health checks
async fn health_check_task(ctx: HealthContext) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    while ctx.is_running().await {
        interval.tick().await;

        let health = HealthCheck::check(&ctx).await;
        match health.status {
            HealthStatus::Healthy => info!(
                "Health check: {} - storage {}, {} ranges created",
                health.status, health.storage.status, health.stats.ranges_created
            ),
            _ => warn!(
                "Health check: {} - storage {}: {}",
                health.status,
                health.storage.status,
                health.storage.error.as_deref().unwrap_or("no error reported")
            ),
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Range Vault");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   API port: {}", config.service.http_port);
    info!("   Health port: {}", config.service.health_port);
    info!("   Storage: {}", config.storage.backend);
    if config.storage.backend == StorageBackend::Mongo {
        info!("   Database: {}", config.storage.database);
    }
    match config.range_quota() {
        Some(limit) => info!("   Range quota: {} per user", limit),
        None => info!("   Range quota: disabled"),
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file, environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    if let Some(backend) = args.storage {
        config.storage.backend = backend;
    }

    if let Some(uri) = &args.mongodb_uri {
        config.storage.uri = uri.clone();
    }

    if args.no_quota {
        config.ranges.enforce_quota = false;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let health_task = tokio::spawn(health_check_task(app_state.health_context()));

    info!("✅ Range Vault is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => warn!("Shutdown completed with errors: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Range Vault stopped");
    Ok(())
}

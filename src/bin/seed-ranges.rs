//! Range seeding CLI tool
//!
//! Loads ranges into the configured store through the range service, so the
//! same validation and quota rules apply as for API clients.
//!
//! Usage:
//!   cargo run --bin seed-ranges -- load --file ranges.json
//!   cargo run --bin seed-ranges -- sample --user "user-1" --count 12
//!   cargo run --bin seed-ranges -- list --user "user-1"

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use range_vault::config::{AppConfig, StorageBackend};
use range_vault::model::{
    Action, ActionType, CardValue, ClosedSet, HandRange, Range, RangePayload,
};
use range_vault::service::AppState;

#[derive(Parser)]
#[command(name = "seed-ranges")]
#[command(about = "Load poker ranges into the range store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables apply otherwise
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storage backend override (memory, mongo)
    #[arg(long)]
    storage: Option<StorageBackend>,

    /// MongoDB URI override
    #[arg(long)]
    mongodb_uri: Option<String>,

    /// Skip the per-user quota
    #[arg(long)]
    no_quota: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Save every range from a JSON array file
    Load {
        /// Path to a JSON file holding an array of ranges
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Generate pocket-pair ranges for one user
    Sample {
        /// Owning user id
        #[arg(short, long)]
        user: String,
        /// Number of ranges to generate
        #[arg(short, long, default_value = "3")]
        count: usize,
    },
    /// List stored ranges, optionally for one user
    List {
        #[arg(short, long)]
        user: Option<String>,
    },
}

/// One bucket per pocket pair, aces first, raising more with stronger pairs
fn sample_range(user: &str, index: usize) -> Range {
    let pairs = CardValue::VARIANTS.len();
    let hands = CardValue::VARIANTS
        .iter()
        .rev()
        .enumerate()
        .map(|(strength, (_, value))| {
            let symbol = value.symbol();
            let raise = 1.0 - strength as f64 / pairs as f64;
            HandRange::new(
                format!("{}{}", symbol, symbol),
                6.0 / 1326.0,
                vec![
                    Action::new(ActionType::Raise, raise),
                    Action::new(ActionType::Call, 1.0 - raise),
                ],
            )
        })
        .collect();

    Range::new(format!("{} pairs #{}", user, index + 1), user, hands)
}

fn load_ranges(file: &PathBuf) -> Result<Vec<Range>> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let payloads: Vec<RangePayload> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of ranges", file.display()))?;

    payloads
        .into_iter()
        .enumerate()
        .map(|(i, payload)| {
            Range::try_from(payload).with_context(|| format!("Range #{} is invalid", i + 1))
        })
        .collect()
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(backend) = cli.storage {
        config.storage.backend = backend;
    }
    if let Some(uri) = &cli.mongodb_uri {
        config.storage.uri = uri.clone();
    }
    if cli.no_quota {
        config.ranges.enforce_quota = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    println!(
        "🔌 Connecting to {} storage ({})",
        config.storage.backend, config.storage.database
    );
    let app = match AppState::new(config).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ Failed to initialize range store: {}", e);
            std::process::exit(1);
        }
    };
    let service = app.ranges();

    let ranges = match cli.command {
        Commands::Load { file } => load_ranges(&file)?,
        Commands::Sample { user, count } => (0..count).map(|i| sample_range(&user, i)).collect(),
        Commands::List { user } => {
            let ranges = match user {
                Some(user) => service.get_ranges_by_user_id(&user).await?,
                None => service.get_all_ranges().await?,
            };
            println!("Found {} ranges:", ranges.len());
            for range in ranges {
                println!(
                    "  {} '{}' (user {}, {} hands)",
                    range.id.as_deref().unwrap_or("-"),
                    range.name,
                    range.user_id,
                    range.hands_range.len()
                );
            }
            return Ok(());
        }
    };

    let mut saved = 0;
    let mut failed = 0;
    for range in ranges {
        let name = range.name.clone();
        match service.save_range(range).await {
            Ok(stored) => {
                println!(
                    "✅ Saved '{}' as {}",
                    name,
                    stored.id.as_deref().unwrap_or("-")
                );
                saved += 1;
            }
            Err(e) => {
                println!("❌ '{}' rejected ({}): {}", name, e.kind(), e);
                failed += 1;
            }
        }
    }

    println!("\n📊 {} saved, {} rejected", saved, failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

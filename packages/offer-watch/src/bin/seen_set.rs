//! Operator CLI for the seen-set document.
//!
//! Inspect and repair the watcher's persisted state without starting a
//! browser.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use offer_watch::{telemetry, AppConfig, JsonFileStore, SeenStore};

#[derive(Parser)]
#[command(name = "seen-set")]
#[command(about = "Inspect and maintain the offer watcher's seen-set")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $OFFER_WATCH_CONFIG, then config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seen-set document (overrides watchdog.store_path)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored offers
    List {
        /// Print full JSON records
        #[arg(long)]
        json: bool,
    },

    /// Remove offers whose sub-offers have all ended
    Prune,

    /// Remove one offer so it is surfaced again
    Forget {
        /// Item id
        item_id: String,
    },

    /// Print the resolved configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing("warn");

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    let store_path = cli
        .store
        .unwrap_or_else(|| config.watchdog.store_path.clone());

    match cli.command {
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::List { json } => cmd_list(&open_store(store_path).await?, json).await,
        Commands::Prune => cmd_prune(&open_store(store_path).await?).await,
        Commands::Forget { item_id } => cmd_forget(&open_store(store_path).await?, &item_id).await,
    }
}

/// A missing config file is fine for this tool; defaults apply.
fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig> {
    let path = AppConfig::resolve_path(explicit);
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        return Ok(AppConfig::default());
    }
    AppConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

async fn open_store(path: PathBuf) -> Result<JsonFileStore> {
    JsonFileStore::open(&path)
        .await
        .with_context(|| format!("Failed to open seen-set {}", path.display()))
}

async fn cmd_list(store: &JsonFileStore, json: bool) -> Result<()> {
    let items = store.all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let now = Utc::now();
    for info in &items {
        let ends = info
            .item
            .offers
            .iter()
            .filter_map(|offer| offer.end_time)
            .max()
            .map(|end| end.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let status = if info.is_expired(now) { "expired" } else { "active" };

        println!("{}\t{}\t{}\t{}", info.key(), status, ends, info.game_title());
    }
    println!("{} offers in {}", items.len(), store.path().display());
    Ok(())
}

async fn cmd_prune(store: &JsonFileStore) -> Result<()> {
    let now = Utc::now();
    let mut pruned = 0;

    for info in store.all().await? {
        if info.is_expired(now) && store.remove(&info).await? {
            println!("Pruned {} ({})", info.key(), info.game_title());
            pruned += 1;
        }
    }
    println!("Pruned {} expired offers", pruned);
    Ok(())
}

async fn cmd_forget(store: &JsonFileStore, item_id: &str) -> Result<()> {
    let target = store
        .all()
        .await?
        .into_iter()
        .find(|info| info.key() == item_id)
        .with_context(|| format!("No stored offer with item id {}", item_id))?;

    store.remove(&target).await?;
    println!("Forgot {} ({})", target.key(), target.game_title());
    Ok(())
}

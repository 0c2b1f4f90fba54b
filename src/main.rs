//! Relic Sync - Warframe Market price & composition database
//!
//! Syncs the prime part, prime set and relic catalog from warframe.market
//! into SQLite. Runs continuously with hourly consistency checks; actual
//! work only happens when the audit finds something missing or outdated.

use clap::Parser;
use relic_sync::database::init_schema;
use relic_sync::{run_sync, MarketClient};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::interval;

/// Warframe Market sync - collects prices and derives set/relic documents
#[derive(Parser, Debug)]
#[command(name = "relic_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Run once and exit (default: run continuously)
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Check interval in hours when running continuously
    #[arg(long, default_value_t = 1)]
    interval_hours: u64,

    /// Re-project stored set prices from current raw prices
    #[arg(long, default_value_t = false)]
    refresh_set_prices: bool,

    /// Re-project stored relic prices from current raw prices
    #[arg(long, default_value_t = false)]
    refresh_relic_prices: bool,
}

/// Returns the default database path: ~/.local/share/relic_sync/relic.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("relic_sync")
        .join("relic.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting relic_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    let client = MarketClient::new();

    if args.once {
        if !run_once(&mut conn, &client, &args).await {
            std::process::exit(1);
        }
    } else {
        log::info!(
            "Running in daemon mode, checking every {} hour(s)",
            args.interval_hours
        );
        run_daemon(&mut conn, &client, &args).await;
    }
}

/// Run the sync daemon - checks periodically and syncs when needed
async fn run_daemon(conn: &mut Connection, client: &MarketClient, args: &Args) {
    let check_interval = Duration::from_secs(args.interval_hours * 3600);
    let mut ticker = interval(check_interval);

    loop {
        ticker.tick().await;
        run_once(conn, client, args).await;
    }
}

/// Run a single sync pass. Returns false when the run failed.
async fn run_once(conn: &mut Connection, client: &MarketClient, args: &Args) -> bool {
    match run_sync(
        conn,
        client,
        args.refresh_set_prices,
        args.refresh_relic_prices,
    )
    .await
    {
        Ok((_, report)) => {
            if report.total_writes() > 0 {
                log::info!(
                    "Sync finished: {} rows written ({} fetches failed)",
                    report.total_writes(),
                    report.fetch_failures
                );
            } else {
                log::info!("Sync finished: store already up to date");
            }
            true
        }
        Err(e) => {
            log::error!("Sync failed: {}", e);
            false
        }
    }
}

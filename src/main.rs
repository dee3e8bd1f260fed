//! Jobsift main entry point
//!
//! This is the command-line interface for the jobsift posting harvester.

use clap::Parser;
use jobsift::config::load_config_with_hash;
use jobsift::crawler::ScrapeCoordinator;
use jobsift::output::{print_run_summary, print_store_stats};
use jobsift::store::{open_store, Store};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Jobsift: a change-aware job posting harvester
///
/// Jobsift walks configured job sites page by page, extracts listings, and
/// keeps a deduplicated local store that knows which postings are new,
/// which changed, and which merely reappeared.
#[derive(Parser, Debug)]
#[command(name = "jobsift")]
#[command(version = "0.1.0")]
#[command(about = "A change-aware job posting harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl and classify without writing anything to the store
    #[arg(long, conflicts_with_all = ["stats", "cleanup"])]
    dry_run: bool,

    /// Show statistics from the store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cleanup"])]
    stats: bool,

    /// Delete irrelevant postings older than the given number of days and exit
    #[arg(long, value_name = "DAYS", conflicts_with_all = ["dry_run", "stats"])]
    cleanup: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.stats {
        handle_stats(&config)?;
    } else if let Some(days) = cli.cleanup {
        handle_cleanup(&config, days)?;
    } else {
        handle_harvest(&config, cli.dry_run).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jobsift=info,warn"),
            1 => EnvFilter::new("jobsift=debug,info"),
            2 => EnvFilter::new("jobsift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows statistics from the store
fn handle_stats(config: &jobsift::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.store.database_path);

    let store = open_store(Path::new(&config.store.database_path))?;
    let stats = store.stats()?;
    print_store_stats(&stats);

    Ok(())
}

/// Handles the --cleanup mode: removes stale irrelevant postings
fn handle_cleanup(config: &jobsift::Config, days: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(Path::new(&config.store.database_path))?;
    let deleted = store.delete_stale(days)?;
    println!(
        "Deleted {} irrelevant postings older than {} days",
        deleted, days
    );
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &jobsift::Config,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let enabled = config.enabled_sites().count();
    if enabled == 0 {
        tracing::warn!("No sites enabled, nothing to do");
        return Ok(());
    }

    if dry_run {
        tracing::info!("Dry run: nothing will be written to the store");
    }
    tracing::info!("Harvesting {} enabled site(s)", enabled);

    let mut store = open_store(Path::new(&config.store.database_path))?;

    // First ctrl-c requests a graceful stop; the run winds down at the next
    // page boundary
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current page and stopping");
            cancel_flag.store(true, Ordering::Relaxed);
        }
    });

    let coordinator = ScrapeCoordinator::new().dry_run(dry_run);
    let summary = coordinator.run_all(config, &mut store, cancel).await;

    print_run_summary(&summary);

    if !dry_run {
        let stats = store.stats()?;
        println!();
        print_store_stats(&stats);
    }

    Ok(())
}

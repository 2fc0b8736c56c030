//! comtrack CLI
//!
//! Entry point for scheduled jobs and local runs of the commission status
//! tracker.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use comtrack::{
    error::Result,
    models::Config,
    pipeline::{self, UpdateOptions},
    services::SnapshotCache,
    storage::LocalStore,
    tracker::StatusParser,
    utils::log as console,
};

/// comtrack - Commission status tracker
#[derive(Parser, Debug)]
#[command(
    name = "comtrack",
    version,
    about = "Tracks whether creators in a commission directory are accepting new orders"
)]
struct Cli {
    /// Path to storage directory containing config and data files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every trackable vendor and record status changes
    Update {
        /// Re-fetch every URL, bypassing cached snapshots
        #[arg(long)]
        refresh: bool,

        /// Compute changes but do not persist anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and compile all patterns
    Validate,

    /// Dump the materialized status and false-positive patterns
    Patterns,
}

/// Initialize logging from the verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    init_logging(cli.verbose, &config.logging.level);
    config.validate()?;

    match cli.command {
        Command::Update { refresh, dry_run } => {
            let parser = StatusParser::new(&config.patterns)?;
            let cache = SnapshotCache::new(&config.fetcher)?;
            let store = LocalStore::new(&cli.storage_dir);

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupt received, aborting before commit");
                    signal_cancel.cancel();
                }
            });

            let summary = pipeline::run_update(
                &config,
                &store,
                &cache,
                &parser,
                UpdateOptions { refresh, dry_run },
                &cancel,
            )
            .await?;

            console::header("Tracking pass complete");
            console::summary(
                "Update",
                &[
                    ("checked", summary.checked.to_string()),
                    ("changed", summary.changed.to_string()),
                    ("failed", summary.failed.to_string()),
                ],
            );
            for failure in &summary.failures {
                console::sub_item(&format!(
                    "{} ( {} ): {} - {}",
                    failure.vendor, failure.url, failure.kind, failure.message
                ));
            }
            if summary.dry_run {
                console::success("Dry run: nothing was persisted.");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            let parser = StatusParser::new(&config.patterns)?;
            log::info!(
                "✓ Config OK ({} open, {} closed, {} false-positive patterns)",
                parser.open_patterns().len(),
                parser.closed_patterns().len(),
                parser.false_positive_patterns().len()
            );
        }

        Command::Patterns => {
            let parser = StatusParser::new(&config.patterns)?;

            console::header("OPEN");
            for pattern in parser.open_patterns() {
                console::sub_item(&pattern.to_string());
            }
            console::header("CLOSED");
            for pattern in parser.closed_patterns() {
                console::sub_item(&pattern.to_string());
            }
            console::header("FALSE POSITIVES");
            for pattern in parser.false_positive_patterns() {
                console::sub_item(&pattern.to_string());
            }
        }
    }

    Ok(())
}

//! riksvote-ingest - legislative open data ingest
//!
//! Batch job that pulls members, documents, ballots and decision texts from
//! the Riksdag open data API into the riksvote SQLite store. Each stage is
//! its own subcommand; `run` executes all of them in dependency order and
//! stops at the first failing stage with a non-zero exit status.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use riksvote_common::config::{load_toml_config, resolve_config_path};
use riksvote_common::Session;
use riksvote_ingest::db::consistency::{table_counts, verify_consistency};
use riksvote_ingest::{resolve_settings, CliOverrides, IngestOrchestrator, Stage};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for riksvote-ingest
#[derive(Parser, Debug)]
#[command(name = "riksvote-ingest")]
#[command(about = "Ingest Riksdag members, documents and votes into SQLite")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(long, global = true, env = "RIKSVOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Store connection string (sqlite://...)
    #[arg(long, global = true, env = "RIKSVOTE_DATABASE_URL")]
    database_url: Option<String>,

    /// Session to ingest (YYYY/YY); repeat for several
    #[arg(long = "session", global = true, value_name = "YYYY/YY")]
    sessions: Vec<Session>,

    /// Minimum delay between upstream requests
    #[arg(long, global = true)]
    request_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh the member roster
    Members,
    /// Ingest documents per kind and session
    Documents,
    /// Ingest ballots for stored committee reports and aggregate them
    Ballots,
    /// Store decision points and backfill voting event labels
    Decisions {
        /// Skip documents that already have decision points stored
        #[arg(long)]
        missing_only: bool,
    },
    /// Link motions and propositions to the reports that resolved them
    Links,
    /// Run every stage in order
    Run,
    /// Check stored aggregates against stored ballots
    Verify,
    /// Print row counts per table
    Stats,
}

/// Default filter for our crates at `level`
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("riksvote_ingest={level},riksvote_common={level}", level = level))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(env_filter.unwrap_or_else(|| log_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = load_toml_config(&config_path)?;

    let missing_only = matches!(args.command, Command::Decisions { missing_only: true });
    let settings = resolve_settings(
        &CliOverrides {
            database_url: args.database_url.clone(),
            sessions: args.sessions.clone(),
            request_delay_ms: args.request_delay_ms,
            missing_only,
        },
        toml_config.as_ref(),
    )?;

    if !level_from_env {
        filter_handle
            .reload(log_filter(&settings.log_level))
            .context("Apply configured log level")?;
    }

    info!("Starting riksvote-ingest {}", env!("CARGO_PKG_VERSION"));
    info!(
        config = %config_path.display(),
        config_found = toml_config.is_some(),
        "Configuration resolved"
    );

    let db = riksvote_common::db::init_database(&settings.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database_url))?;

    let stage = match args.command {
        Command::Members => Stage::Members,
        Command::Documents => Stage::Documents,
        Command::Ballots => Stage::Ballots,
        Command::Decisions { .. } => Stage::Decisions,
        Command::Links => Stage::Links,
        Command::Run => {
            let orchestrator = IngestOrchestrator::new(db, settings)?;
            let report = orchestrator.execute_run().await?;
            for stage in &report.stages {
                info!("{}", stage.display_string());
            }
            info!("Total elapsed: {:.1}s", report.elapsed.as_secs_f64());
            return Ok(());
        }
        Command::Verify => {
            let discrepancies = verify_consistency(&db).await?;
            if discrepancies.is_empty() {
                info!("Aggregates consistent with stored ballots");
                return Ok(());
            }
            for discrepancy in &discrepancies {
                error!("{}", discrepancy);
            }
            bail!("{} aggregate discrepancies found", discrepancies.len());
        }
        Command::Stats => {
            for (table, count) in table_counts(&db).await? {
                println!("{:<22} {:>10}", table, count);
            }
            return Ok(());
        }
    };

    let orchestrator = IngestOrchestrator::new(db, settings)?;
    let report = orchestrator.run_stage(stage).await?;
    info!("{}", report.display_string());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_covers_both_crates() {
        let filter = log_filter("debug").to_string();
        assert!(filter.contains("riksvote_ingest=debug"), "{}", filter);
        assert!(filter.contains("riksvote_common=debug"), "{}", filter);
    }

    #[test]
    fn test_decisions_missing_only_flag() {
        let args = Args::try_parse_from(["riksvote-ingest", "--session", "2023/24", "decisions", "--missing-only"])
            .unwrap();
        assert!(matches!(args.command, Command::Decisions { missing_only: true }));
        assert_eq!(args.sessions.len(), 1);
    }
}

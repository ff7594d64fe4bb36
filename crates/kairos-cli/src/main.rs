mod config;
mod fixtures;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kairos_common::error::Result;
use kairos_common::utils::init_log;
use kairos_engine::builder::SnapshotBuilder;
use kairos_engine::query::QueryEngine;
use kairos_store::{FileStore, PostgresStore, Store};

use crate::config::{Backend, Config};

#[derive(Parser)]
#[command(name = "kairos")]
#[command(about = "Time-travel standings queries over a finished contest", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "kairos_config.yml", global = true)]
    config: String,

    /// Directory holding problems.json/submissions.json/hacks.json/contest.json
    #[arg(short, long, default_value = "fixtures", global = true)]
    fixtures: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the full submission stream into `standingsState`
    InitializeStandingsState { contest_id: i64 },
    /// Build a full base snapshot at T
    CreateBaseSnapshot { contest_id: i64, t: i64 },
    /// Build a delta snapshot against the nearest prior snapshot
    CreateDeltaSnapshot { contest_id: i64, t: i64 },
    /// Build every snapshot due in [start, end] at the configured cadence
    CreateSnapshotsBulk {
        contest_id: i64,
        start: i64,
        end: i64,
    },
    /// Answer a time-travel standings query
    StandingsAt {
        contest_id: i64,
        /// Relative time in seconds; defaults to the contest's duration
        #[arg(long)]
        t: Option<i64>,
        #[arg(long, default_value_t = 1)]
        rank_from: i64,
        #[arg(long)]
        rank_to: Option<i64>,
        #[arg(long, default_value_t = false)]
        include_unofficial: bool,
    },
    /// Diff the snapshot-reconstructed standings at T against a full replay
    Validate { contest_id: i64, t: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: Config =
        serde_yaml::from_reader(File::open(&cli.config).expect("failed to open the config file!"))
            .expect("failed to read the config!");

    let _log_guard = init_log(&config.log_file, config.log_level);

    let store: Arc<dyn Store> = match config.backend {
        Backend::File => Arc::new(FileStore::new(&config.data_dir)),
        Backend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .expect("backend=postgres requires databaseUrl");
            let store = PostgresStore::connect(url)
                .await
                .expect("failed to connect to postgres");
            store.run_migrations().await.expect("failed to run migrations");
            Arc::new(store)
        }
    };

    if let Err(e) = run(cli.command, &cli.fixtures, store, &config).await {
        eprintln!("{}: {}", e.tag(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    command: Commands,
    fixtures_dir: &std::path::Path,
    store: Arc<dyn Store>,
    config: &Config,
) -> Result<()> {
    match command {
        Commands::InitializeStandingsState { contest_id } => {
            let fx = Arc::new(fixtures::load(fixtures_dir, contest_id)?);
            let builder = SnapshotBuilder::new(store, fx.clone(), fx.clone(), Some(fx));
            builder.initialize_standings_state(contest_id).await?;
            println!("standings state initialized for contest {contest_id}");
        }
        Commands::CreateBaseSnapshot { contest_id, t } => {
            let fx = Arc::new(fixtures::load(fixtures_dir, contest_id)?);
            let builder = SnapshotBuilder::new(store, fx.clone(), fx.clone(), Some(fx));
            let snapshot = builder.create_base_snapshot(contest_id, t).await?;
            print_json(&snapshot)?;
        }
        Commands::CreateDeltaSnapshot { contest_id, t } => {
            let fx = Arc::new(fixtures::load(fixtures_dir, contest_id)?);
            let builder = SnapshotBuilder::new(store, fx.clone(), fx.clone(), Some(fx));
            match builder.create_delta_snapshot(contest_id, t).await? {
                kairos_engine::SnapshotOutcome::Base(s) => print_json(&s)?,
                kairos_engine::SnapshotOutcome::Delta(s) => print_json(&s)?,
            }
        }
        Commands::CreateSnapshotsBulk {
            contest_id,
            start,
            end,
        } => {
            let fx = Arc::new(fixtures::load(fixtures_dir, contest_id)?);
            let builder = SnapshotBuilder::new(store, fx.clone(), fx.clone(), Some(fx));
            let report = builder
                .create_snapshots_bulk(
                    contest_id,
                    start,
                    end,
                    config.base_interval_seconds,
                    config.delta_interval_seconds,
                )
                .await?;
            print_json(&BulkReportView::from(report))?;
        }
        Commands::StandingsAt {
            contest_id,
            t,
            rank_from,
            rank_to,
            include_unofficial,
        } => {
            let fx = Arc::new(fixtures::load(fixtures_dir, contest_id)?);
            let engine = QueryEngine::new(store, fx.clone(), fx.clone(), Some(fx.clone()), fx);
            let result = engine
                .standings_at(
                    contest_id,
                    t,
                    rank_from,
                    rank_to,
                    include_unofficial,
                    config.hack_scoring_enabled,
                )
                .await?;
            print_json(&result)?;
        }
        Commands::Validate { contest_id, t } => {
            let fx = Arc::new(fixtures::load(fixtures_dir, contest_id)?);
            let engine = QueryEngine::new(store, fx.clone(), fx.clone(), Some(fx.clone()), fx);
            let report = engine.validate(contest_id, t).await?;
            print_json(&report)?;
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkReportView {
    base_created: i64,
    delta_created: i64,
    errors: Vec<ErrorView>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorView {
    timestamp_seconds: i64,
    message: String,
}

impl From<kairos_engine::BulkSnapshotReport> for BulkReportView {
    fn from(report: kairos_engine::BulkSnapshotReport) -> Self {
        Self {
            base_created: report.base_created,
            delta_created: report.delta_created,
            errors: report
                .errors
                .into_iter()
                .map(|e| ErrorView {
                    timestamp_seconds: e.timestamp_seconds,
                    message: e.message,
                })
                .collect(),
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

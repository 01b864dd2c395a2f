//! SWAPI Ingest - loads people from the Star Wars API into PostgreSQL

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::sync::Arc;
use swapi_common::logging::{init_logging, LogConfig, LogLevel};
use swapi_ingest::{Config, HttpFetcher, MemoryStore, PgPeopleStore, RunSummary, WaveScheduler};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "swapi-ingest")]
#[command(author, version, about = "Load SWAPI people into a local database")]
struct Cli {
    /// First person id to fetch (default: SWAPI_FIRST_ID or 1)
    #[arg(long)]
    first: Option<i64>,

    /// Last person id to fetch, inclusive (default: SWAPI_LAST_ID or 85)
    #[arg(long)]
    last: Option<i64>,

    /// Requests issued together per wave (default: SWAPI_WAVE_SIZE or 5)
    #[arg(short, long)]
    wave_size: Option<usize>,

    /// People collection URL (default: SWAPI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Validate and count records without touching the database
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(first) = self.first {
            config.api.first_id = first;
        }
        if let Some(last) = self.last {
            config.api.last_id = last;
        }
        if let Some(wave_size) = self.wave_size {
            config.api.wave_size = wave_size;
        }
        if let Some(ref base_url) = self.base_url {
            config.api.base_url = base_url.clone();
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("swapi-ingest")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let mut config = Config::load()?;
    cli.apply(&mut config);
    config.validate()?;

    let started_at = Local::now();
    info!(started_at = %started_at, "Starting API data load");

    let summary = run(&config, cli.dry_run).await?;

    let finished_at = Local::now();
    let elapsed = finished_at - started_at;
    info!(
        finished_at = %finished_at,
        people_stored = summary.inserted,
        records_skipped = summary.rejected,
        "Finished loading into the local database"
    );
    info!(
        elapsed_secs = %format!("{:.3}", elapsed.num_milliseconds() as f64 / 1000.0),
        "Run duration"
    );

    Ok(())
}

async fn run(config: &Config, dry_run: bool) -> Result<RunSummary> {
    let range = config.range()?;
    let wave_size = config.api.wave_size;
    let fetcher = HttpFetcher::new(&config.api)?;

    if dry_run {
        info!("Dry run: records are kept in memory only");
        let store = Arc::new(MemoryStore::new());
        let summary = WaveScheduler::new(fetcher, store).ingest(range, wave_size).await?;
        return Ok(summary);
    }

    let store = Arc::new(PgPeopleStore::connect(&config.database).await?);
    let outcome = WaveScheduler::new(fetcher, Arc::clone(&store))
        .ingest(range, wave_size)
        .await;
    store.close().await;

    Ok(outcome?)
}

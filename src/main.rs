//! wxscrape - Historical station weather for detector events
//!
//! Backfills the observation tables of every detector deployment, scans date
//! ranges for thunderstorms, and classifies the weather at a single event.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use wxscrape::backfill::{self, RunOutcome};
use wxscrape::cache::SystemLiveness;
use wxscrape::cli::{BackfillArgs, Cli, Commands, EventArgs, StormsArgs};
use wxscrape::config::{BackfillConfig, FetchMode, TimeConstants};
use wxscrape::data::{BrowserClient, Calendar, HistoryFetcher, TimezoneNormalizer, WundergroundClient};
use wxscrape::logging;
use wxscrape::lookup::{weather_at_event, EventRequest};
use wxscrape::storms::{complete_query, run_storm_query};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Backfill(args) => run_backfill(config, args).await,
        Commands::Storms(args) => run_storms(&config, args).await,
        Commands::Event(args) => run_event(&config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<BackfillConfig> {
    match path {
        Some(path) => BackfillConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(BackfillConfig::default()),
    }
}

fn fetcher(config: &BackfillConfig) -> Result<HistoryFetcher> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let fetcher = match config.fetch_mode {
        FetchMode::Browser => HistoryFetcher::Browser(BrowserClient::new(&config.webdriver_url, timeout)),
        FetchMode::Http => {
            HistoryFetcher::Http(WundergroundClient::new(timeout).context("building the HTTP client")?)
        }
    };
    Ok(fetcher)
}

async fn run_backfill(mut config: BackfillConfig, args: BackfillArgs) -> Result<()> {
    if let Some(dir) = args.weather_dir {
        config.weather_dir = dir;
    }
    let calendar = Calendar::new(TimeConstants::default());
    let fetcher = fetcher(&config)?;
    let outcome = backfill::run(&config, calendar, &fetcher, &SystemLiveness)
        .await
        .with_context(|| format!("backfilling into {}", config.weather_dir.display()))?;

    // Another instance is working; exit quietly
    if let RunOutcome::AlreadyRunning(pid) = outcome {
        tracing::info!(pid, "backfill already running, exiting");
    }
    Ok(())
}

async fn run_storms(config: &BackfillConfig, args: StormsArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let query = complete_query(&mut stdin.lock(), &mut stdout, args.from, args.to, args.station)
        .context("reading the query")?;

    let log = File::create(&args.log)
        .with_context(|| format!("creating log file {}", args.log.display()))?;
    let mut log = BufWriter::new(log);

    run_storm_query(&fetcher(config)?, &query, &mut stdout, &mut log)
        .await
        .context("writing the storm report")
}

async fn run_event(config: &BackfillConfig, args: EventArgs) -> Result<()> {
    let request = EventRequest {
        date: args.date,
        seconds: args.time,
        station: args.station,
        utc_offset_hours: args.utc_offset,
        observe_dst: args.dst,
    };
    let normalizer = TimezoneNormalizer::new(TimeConstants::default());
    let weather = weather_at_event(&fetcher(config)?, &normalizer, &request)
        .await
        .context("looking up event weather")?;

    if args.summary {
        println!("{}", weather.summary);
    } else {
        println!("{}", weather.class.code());
    }
    Ok(())
}

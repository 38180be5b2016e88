//! Headless race driver.
//!
//! Runs races through the same command surface a windowed front end would
//! use, printing each result and optionally appending it to the results log.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snake_race::config::RaceConfig;
use snake_race::race::{RaceError, RaceOrchestrator, TickOutcome};
use snake_race::results::{CsvResultsLog, ResultsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Replay {
    /// every race after the first gets a new seed
    NewSeed,
    /// every race reuses the first seed
    SameSeed,
}

#[derive(Parser, Debug)]
#[command(name = "snake-race")]
#[command(about = "Race a BFS snake against an A* snake", version)]
struct Cli {
    /// Seed for the first race, drawn at random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON race config, missing fields use the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of races to run
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    races: u32,

    /// How seeds are chosen after the first race
    #[arg(long, value_enum, default_value_t = Replay::NewSeed)]
    replay: Replay,

    /// Append every result to this CSV log
    #[arg(long)]
    save: Option<PathBuf>,

    /// Sleep one tick period per tick instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Print both boards when a race ends
    #[arg(long)]
    board: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RaceConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RaceConfig::default(),
    };
    let mut race = RaceOrchestrator::new(config).context("invalid race config")?;
    let mut log = cli.save.clone().map(CsvResultsLog::new);

    for n in 0..cli.races {
        if n == 0 {
            race.start_race(cli.seed)?;
        } else {
            match cli.replay {
                Replay::NewSeed => race.replay_new_seed()?,
                Replay::SameSeed => race.replay_same_seed()?,
            }
        }

        let results = run_race(&mut race, cli.realtime)?;
        report(&race, &results, &cli)?;

        if let Some(log) = log.as_mut() {
            match race.save_results(log) {
                Ok(()) => info!(path = %log.path().display(), "saved results"),
                // a failed save never stops the run
                Err(RaceError::Export(e)) => warn!(error = %e, "results were not saved"),
                Err(e) => return Err(e.into()),
            }
        }
    }

    race.return_to_menu()?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run_race(race: &mut RaceOrchestrator, realtime: bool) -> Result<ResultsSnapshot> {
    let period = Duration::from_secs_f64(1.0 / f64::from(race.config().tick_rate_hz));
    loop {
        if let TickOutcome::Finished(results) = race.tick()? {
            return Ok(results);
        }
        if realtime {
            thread::sleep(period);
        }
    }
}

fn report(race: &RaceOrchestrator, results: &ResultsSnapshot, cli: &Cli) -> Result<()> {
    if cli.board {
        if let Some(session) = race.session() {
            for agent in session.agents() {
                println!("{}", agent);
            }
        }
    }
    if cli.json {
        println!("{}", serde_json::to_string(results)?);
    } else {
        println!("{}", results);
    }
    Ok(())
}

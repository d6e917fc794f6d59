use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use slate_grader::api::lines_api::LinesApiClient;
use slate_grader::api::schedule_api::ScheduleApiClient;
use slate_grader::api::sports_db_api::SportsDbClient;
use slate_grader::config::{init_tracing, Config};
use slate_grader::data::{load_state, save_graded_picks_to_csv, save_state};
use slate_grader::grading::grade_pick;
use slate_grader::models::{MatchupOutcome, MatchupStatus};
use slate_grader::odds_converter::{american_odds_to_probability, american_to_decimal};
use slate_grader::orchestrator::{
    run_workers, Job, JobQueue, LiveScoreWorker, OddsUpdateWorker, TokioJobQueue, Workers,
};
use slate_grader::payout::{parlay_payout, points_awarded};
use slate_grader::slate::{
    august_model, build_slate, day_range, league_weight_ranges, upcoming_week_dates, LEAGUES,
};
use slate_grader::store::InMemoryStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "slate", about = "Daily slate builder and pick grader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grade every outcome in a JSON file (one object or an array)
    Grade { file: PathBuf },
    /// Show decimal odds, implied probability and payout for an American price
    Convert {
        #[arg(allow_negative_numbers = true)]
        odds: i32,
    },
    /// Payout for a parlay whose legs all won
    Parlay {
        #[arg(long)]
        wager: Option<Decimal>,
        #[arg(required = true, allow_negative_numbers = true)]
        odds: Vec<i32>,
    },
    /// Selection ranges for the leagues playing today under the August model
    Weights {
        #[arg(required = true)]
        leagues: Vec<String>,
    },
    /// Discover this week's games and add today's slate to a state file
    Slate { state: Option<PathBuf> },
    /// Track odds and live scores for every open matchup until Ctrl+C
    Work { state: Option<PathBuf> },
    /// Export graded picks to CSV
    Export {
        csv: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

fn read_outcomes(file: &Path) -> Result<Vec<MatchupOutcome>> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&json).context("Failed to parse outcomes file")?;

    let outcomes = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|outcome| vec![outcome])
    };
    outcomes.context("File does not hold matchup outcomes")
}

fn grade(file: PathBuf) -> Result<()> {
    for (i, outcome) in read_outcomes(&file)?.iter().enumerate() {
        let matchup = format!("{} @ {}", outcome.away_team, outcome.home_team);
        match grade_pick(outcome) {
            Ok(grade) => match grade.winning_odds() {
                Some(odds) => println!(
                    "{}. {} ({}): {} -> {} at {:+}",
                    i + 1,
                    matchup,
                    outcome.bet_type,
                    outcome.pick,
                    grade.outcome(),
                    odds
                ),
                None => println!(
                    "{}. {} ({}): {} -> {}",
                    i + 1,
                    matchup,
                    outcome.bet_type,
                    outcome.pick,
                    grade.outcome()
                ),
            },
            Err(e) => println!("{}. {}: {}", i + 1, matchup, e),
        }
    }
    Ok(())
}

fn convert(odds: i32, wager: Decimal) -> Result<()> {
    let decimal = american_to_decimal(odds)?;
    println!("American:     {:+}", odds);
    println!("Decimal:      {}", decimal);
    println!(
        "Implied:      {:.1}%",
        american_odds_to_probability(odds) * 100.0
    );
    println!("Pays on {}:  {}", wager, points_awarded(wager, odds)?);
    Ok(())
}

fn weights(leagues: Vec<String>) {
    let active: Vec<&str> = leagues.iter().map(String::as_str).collect();
    let ranges = league_weight_ranges(&active, &august_model());
    if ranges.is_empty() {
        println!("None of those leagues are weighted.");
        return;
    }
    for (league, range) in ranges {
        println!("{:>6}: {:.3} - {:.3}", league, range.start, range.end);
    }
}

async fn slate(config: &Config, state_path: PathBuf) -> Result<()> {
    let client = ScheduleApiClient::new(config.require_schedule_base_url()?.to_string());
    let offset = config.utc_offset();
    let today = config
        .start_date
        .unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
    let model = august_model();

    let week = upcoming_week_dates(today, config.day_offset);
    let mut candidates = Vec::new();
    for league in LEAGUES.iter().filter(|l| model.contains_key(l.id)) {
        let found = client.fetch_candidates(league, &week, offset).await?;
        info!(league = league.slug, candidates = found.len(), "Schedule fetched");
        candidates.extend(found);
    }

    let slate_day = today + ChronoDuration::days(config.day_offset);
    let (day_start, day_end) = day_range(slate_day, offset);
    candidates.retain(|c| c.start_time >= day_start && c.start_time <= day_end);

    let slate = build_slate(
        candidates,
        &model,
        config.slate_size,
        &mut rand::thread_rng(),
    );

    let store = InMemoryStore::new(load_state(&state_path)?.unwrap_or_default());
    let added = store
        .add_matchups(slate.into_iter().map(|c| c.into_matchup()).collect())
        .await;
    save_state(&store.snapshot().await, &state_path)?;

    println!("Added {} matchups for {}", added, slate_day);
    Ok(())
}

async fn work(config: &Config, state_path: PathBuf) -> Result<()> {
    let state = load_state(&state_path)?.unwrap_or_default();
    let store = Arc::new(InMemoryStore::new(state));
    let (queue, receiver) = TokioJobQueue::new();
    let queue: Arc<dyn JobQueue> = Arc::new(queue);

    let scores = Arc::new(SportsDbClient::new(
        config.require_sports_base_url()?.to_string(),
    ));
    let lines = Arc::new(LinesApiClient::new(
        config.require_lines_base_url()?.to_string(),
    ));

    let workers = Arc::new(Workers {
        odds_update: OddsUpdateWorker::new(store.clone(), lines, queue.clone()),
        live_score: LiveScoreWorker::new(store.clone(), scores, queue.clone()),
    });

    for matchup in store.matchups().await {
        let job = match matchup.status {
            MatchupStatus::Finished => continue,
            MatchupStatus::InProgress => Job::live_score(&matchup.id),
            MatchupStatus::Scheduled if matchup.locked => Job::live_score(&matchup.id),
            MatchupStatus::Scheduled => Job::odds_update(&matchup.id),
        };
        queue.enqueue(job, Duration::ZERO).await?;
    }

    run_workers(receiver, workers, queue, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    })
    .await;

    save_state(&store.snapshot().await, &state_path)?;
    Ok(())
}

fn export(config: &Config, csv: PathBuf, state_path: Option<PathBuf>) -> Result<()> {
    let state_path = state_path.unwrap_or_else(|| config.state_path());
    let state = load_state(&state_path)?
        .with_context(|| format!("No state found at {}", state_path.display()))?;
    let written = save_graded_picks_to_csv(&state, &csv)?;
    println!("Saved {} graded picks to {}", written, csv.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match Cli::parse().command {
        Command::Grade { file } => grade(file)?,
        Command::Convert { odds } => convert(odds, config.default_wager)?,
        Command::Parlay { wager, odds } => {
            let wager = wager.unwrap_or(config.default_wager);
            println!("Parlay of {} legs pays {}", odds.len(), parlay_payout(wager, &odds)?);
        }
        Command::Weights { leagues } => weights(leagues),
        Command::Slate { state } => {
            let state = state.unwrap_or_else(|| config.state_path());
            slate(&config, state).await?
        }
        Command::Work { state } => {
            let state = state.unwrap_or_else(|| config.state_path());
            work(&config, state).await?
        }
        Command::Export { csv, state } => export(&config, csv, state)?,
    }

    Ok(())
}

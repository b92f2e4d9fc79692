//! GRIDIRON — Seeded playoff bracket simulator
//!
//! Entry point. Loads configuration, initialises structured logging,
//! loads team features and the wild-card bracket, then runs the
//! simulation, evaluation or preview subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use gridiron::backtest::calibration::{CalibrationPoint, Calibrator};
use gridiron::backtest::scoring::evaluate;
use gridiron::config::AppConfig;
use gridiron::data::bracket::{load_actual_games, CsvBracketSource};
use gridiron::data::features::CsvFeatureSource;
use gridiron::data::{BracketSource, FeatureSource};
use gridiron::engine::bracket::{BracketEngine, BracketScope, CancelFlag};
use gridiron::registry::TeamRegistry;
use gridiron::storage::{self, RunSummary};
use gridiron::types::{Conference, Season};

#[derive(Parser, Debug)]
#[command(name = "gridiron", version, about = "Seeded playoff bracket simulator")]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(long, global = true, env = "GRIDIRON_CONFIG", default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a season's bracket from its wild-card round.
    Simulate {
        #[arg(long)]
        season: Season,
        /// Only play one conference, up to its champion.
        #[arg(long)]
        conference: Option<Conference>,
        /// CSV export path (defaults to the configured results directory).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score an exported simulation against the real results.
    Evaluate {
        #[arg(long)]
        season: Season,
        /// Simulated results CSV (defaults to the configured results directory).
        #[arg(long)]
        results: Option<PathBuf>,
    },
    /// Show the seed table of a season.
    Teams {
        #[arg(long)]
        season: Season,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    match cli.command {
        Command::Simulate {
            season,
            conference,
            output,
        } => simulate(&cfg, season, conference, output).await,
        Command::Evaluate { season, results } => evaluate_season(&cfg, season, results),
        Command::Teams { season } => show_teams(&cfg, season),
    }
}

fn load_registry(cfg: &AppConfig) -> Result<TeamRegistry> {
    let records = CsvFeatureSource::new(cfg.data.features_path()).load()?;
    TeamRegistry::new(records).context("Invalid feature data")
}

// ---------------------------------------------------------------------------
// simulate
// ---------------------------------------------------------------------------

async fn simulate(
    cfg: &AppConfig,
    season: Season,
    conference: Option<Conference>,
    output: Option<PathBuf>,
) -> Result<()> {
    let registry = Arc::new(load_registry(cfg)?);
    let wild_card = CsvBracketSource::new(cfg.data.bracket_path(season)).wild_card(season)?;
    let predictor = cfg.predictor.build()?;
    let predictor_name = predictor.name();

    let scope = conference.map_or(BracketScope::Full, BracketScope::Conference);
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Shutdown signal received; stopping at the next round boundary.");
                cancel.cancel();
            }
        });
    }

    info!(
        season,
        %scope,
        predictor = %predictor_name,
        policy = ?cfg.simulation.odd_team_policy,
        "GRIDIRON starting simulation"
    );

    let engine = BracketEngine::new(registry, predictor, cfg.simulation.engine_config())
        .with_cancel_flag(cancel);

    let csv_path = output.unwrap_or_else(|| cfg.data.results_path(season));
    let summary_path = csv_path.with_extension("json");
    let mut summary = RunSummary::new(season, &scope.to_string(), &predictor_name);

    match engine.run(season, &wild_card, scope).await {
        Ok(outcome) => {
            for game in &outcome.log {
                println!("{game}");
            }
            for (conference, champion) in &outcome.conference_champions {
                println!("{conference} champion: {champion}");
            }
            if scope == BracketScope::Full {
                println!("Champion: {}", outcome.champion);
            }

            storage::export_results_csv(&outcome.log, &csv_path)?;
            summary.games = outcome.log.len();
            summary.champion = Some(outcome.champion.clone());
            storage::save_summary(&summary, &summary_path)?;

            info!(
                season,
                champion = %outcome.champion,
                games = outcome.log.len(),
                path = %csv_path.display(),
                "Simulation results exported"
            );
            Ok(())
        }
        Err(failure) => {
            error!(
                season,
                stage = %failure.stage,
                games = failure.partial.len(),
                error = %failure.error,
                "Simulation aborted"
            );
            for game in &failure.partial {
                println!("{game}");
            }

            if !failure.partial.is_empty() {
                storage::export_results_csv(&failure.partial, &csv_path)?;
            }
            summary.games = failure.partial.len();
            summary.failure = Some(failure.to_string());
            if let Err(e) = storage::save_summary(&summary, &summary_path) {
                error!(error = %e, "Failed to save run summary");
            }

            Err(failure.into())
        }
    }
}

// ---------------------------------------------------------------------------
// evaluate
// ---------------------------------------------------------------------------

fn evaluate_season(cfg: &AppConfig, season: Season, results: Option<PathBuf>) -> Result<()> {
    let results_path = results.unwrap_or_else(|| cfg.data.results_path(season));
    let simulated: Vec<_> = storage::load_results_csv(&results_path)?
        .into_iter()
        .filter(|g| g.season == season)
        .collect();
    if simulated.is_empty() {
        bail!("No simulated games for season {season} in {}", results_path.display());
    }
    let actual = load_actual_games(&cfg.data.truth_path(season), season)?;

    let summary_path = results_path.with_extension("json");
    match storage::load_summary(&summary_path) {
        Ok(summary) => {
            println!(
                "Run {} ({}, {} scope, predictor {}): {} games, champion {}",
                summary.run_id,
                summary.created_at.format("%Y-%m-%d %H:%M UTC"),
                summary.scope,
                summary.predictor,
                summary.games,
                summary.champion.as_deref().unwrap_or("none"),
            );
            if let Some(failure) = &summary.failure {
                warn!(season, failure = %failure, "Evaluating a partial simulation");
            }
        }
        Err(e) => warn!(path = %summary_path.display(), error = %e, "No run summary found"),
    }

    let evaluation = evaluate(&simulated, &actual);
    println!(
        "Season {season}: {} / {} points ({:.1}%)",
        evaluation.points,
        evaluation.max_points,
        evaluation.accuracy() * 100.0
    );
    if evaluation.mismatches.is_empty() {
        println!("No mismatches.");
    } else {
        println!("Mismatches:");
        for mismatch in &evaluation.mismatches {
            println!("  {mismatch}");
        }
    }

    let mut calibrator = Calibrator::new();
    calibrator.add_points(
        evaluation
            .matched
            .iter()
            .map(|(result, correct)| CalibrationPoint::from_result(result, *correct)),
    );
    let report = calibrator.report();
    println!(
        "Calibration: {} games, Brier {:.4}, {:?}",
        report.total_predictions, report.overall_brier, report.diagnosis
    );
    for (round, brier) in &report.round_brier {
        println!("  {round}: Brier {brier:.4}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// teams
// ---------------------------------------------------------------------------

fn show_teams(cfg: &AppConfig, season: Season) -> Result<()> {
    let registry = load_registry(cfg)?;
    if !registry.seasons().contains(&season) {
        bail!("No teams for season {season} in {}", cfg.data.features_path);
    }
    println!("Season {season} ({} bye(s) per conference)", registry.bye_count(season));
    for &conference in Conference::ALL {
        println!("{conference}");
        for record in registry.conference_teams(conference, season) {
            println!("  {:>2}  {}", record.seed, record.team);
        }
    }
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gridiron=info"));

    let json_logging = std::env::var("GRIDIRON_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

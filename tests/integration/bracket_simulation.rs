use std::sync::Arc;

use uuid::Uuid;

use gridiron::backtest::scoring::{evaluate, MismatchReason};
use gridiron::data::bracket::{read_actual_games, read_wild_card};
use gridiron::data::features::read_team_records;
use gridiron::engine::advancer::{OddTeamPolicy, RoundAdvancer};
use gridiron::engine::bracket::{
    BracketEngine, BracketOutcome, BracketScope, CancelFlag, EngineConfig, SimulationFailure,
};
use gridiron::predictor::Predictor;
use gridiron::registry::TeamRegistry;
use gridiron::storage;
use gridiron::types::{BracketError, Conference, Matchup, Round, Season, Stage, TeamRecord};

use crate::stub_predictor::{
    tag_name_order, CancellingPredictor, LexicographicPredictor, STUB_CONFIDENCE,
};

const FEATURES_CSV: &str = include_str!("../../data/processed/playoff_team_features.csv");
const MATCHUPS_2019_CSV: &str = include_str!("../../data/processed/matchups_2019.csv");
const MATCHUPS_2022_CSV: &str = include_str!("../../data/processed/matchups_2022.csv");

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct League {
    registry: Arc<TeamRegistry>,
    predictor: LexicographicPredictor,
}

fn league_from(mut records: Vec<TeamRecord>) -> League {
    let names = tag_name_order(&mut records);
    League {
        registry: Arc::new(TeamRegistry::new(records).unwrap()),
        predictor: LexicographicPredictor::new(names),
    }
}

fn bundled_league() -> League {
    league_from(read_team_records(FEATURES_CSV.as_bytes()).unwrap())
}

/// NFC-only league where MIN holds a better seed than SF.
fn nfc_league() -> League {
    let teams = [("PHI", 1), ("MIN", 2), ("SF", 3), ("DAL", 4), ("TB", 5), ("NYG", 6), ("SEA", 7)];
    league_from(
        teams
            .iter()
            .map(|(team, seed)| TeamRecord::new(2022, team, Conference::NFC, *seed))
            .collect(),
    )
}

fn engine(league: League, config: EngineConfig) -> BracketEngine {
    let predictor: Arc<dyn Predictor> = Arc::new(league.predictor);
    BracketEngine::new(league.registry, predictor, config)
}

fn wild_card(csv: &str, season: Season) -> Vec<Matchup> {
    read_wild_card(csv.as_bytes(), season).unwrap()
}

fn wc(a: &str, b: &str) -> Matchup {
    Matchup::new(2022, Round::WildCard, a, b, Some(Conference::NFC))
}

async fn run_2022(config: EngineConfig) -> BracketOutcome {
    engine(bundled_league(), config)
        .run(2022, &wild_card(MATCHUPS_2022_CSV, 2022), BracketScope::Full)
        .await
        .unwrap()
}

fn pairs(outcome_games: &[&gridiron::types::GameResult]) -> Vec<(String, String)> {
    outcome_games
        .iter()
        .map(|g| (g.team_a.clone(), g.team_b.clone()))
        .collect()
}

fn p(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

// ---------------------------------------------------------------------------
// Full brackets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_bracket_2022() {
    let outcome = run_2022(EngineConfig::default()).await;

    assert_eq!(outcome.champion, "BAL");
    assert_eq!(outcome.conference_champions[&Conference::AFC], "BAL");
    assert_eq!(outcome.conference_champions[&Conference::NFC], "DAL");
    assert_eq!(outcome.log.len(), 13);

    let wild_card_winners = outcome.log.winners(Round::WildCard);
    assert_eq!(wild_card_winners, vec!["JAX", "BUF", "BAL", "SEA", "MIN", "DAL"]);

    assert_eq!(
        pairs(&outcome.log.by_round(Round::Divisional)),
        vec![p("KC", "BAL"), p("BUF", "JAX"), p("PHI", "SEA"), p("MIN", "DAL")]
    );
    assert_eq!(
        pairs(&outcome.log.by_round(Round::ConferenceChampionship)),
        vec![p("BUF", "BAL"), p("PHI", "DAL")]
    );
    // DAL (#5) outranks BAL (#6) in the final.
    assert_eq!(pairs(&outcome.log.by_round(Round::Final)), vec![p("DAL", "BAL")]);

    assert!(outcome.log.iter().all(|g| g.confidence == STUB_CONFIDENCE));
}

#[tokio::test]
async fn test_six_team_format_gives_two_byes() {
    let outcome = engine(bundled_league(), EngineConfig::default())
        .run(2019, &wild_card(MATCHUPS_2019_CSV, 2019), BracketScope::Full)
        .await
        .unwrap();

    assert_eq!(outcome.log.len(), 11);
    assert_eq!(
        pairs(&outcome.log.by_round(Round::Divisional)),
        vec![p("BAL", "BUF"), p("KC", "NE"), p("SF", "MIN"), p("GB", "PHI")]
    );
    assert_eq!(outcome.champion, "BAL");
}

#[tokio::test]
async fn test_winners_halve_each_round() {
    let outcome = run_2022(EngineConfig::default()).await;

    let per_round: Vec<usize> = Round::ALL
        .iter()
        .map(|r| outcome.log.by_round(*r).len())
        .collect();
    assert_eq!(per_round, vec![6, 4, 2, 1]);
}

#[tokio::test]
async fn test_conference_isolation_before_final() {
    let league = bundled_league();
    let registry = league.registry.clone();
    let outcome = engine(league, EngineConfig::default())
        .run(2022, &wild_card(MATCHUPS_2022_CSV, 2022), BracketScope::Full)
        .await
        .unwrap();

    for game in outcome.log.iter().filter(|g| g.round != Round::Final) {
        assert_eq!(
            registry.conference(&game.team_a, 2022).unwrap(),
            registry.conference(&game.team_b, 2022).unwrap(),
            "{game} crosses conferences"
        );
    }
}

#[tokio::test]
async fn test_conference_scope_stops_at_champion() {
    let outcome = engine(bundled_league(), EngineConfig::default())
        .run(
            2022,
            &wild_card(MATCHUPS_2022_CSV, 2022),
            BracketScope::Conference(Conference::AFC),
        )
        .await
        .unwrap();

    assert_eq!(outcome.champion, "BAL");
    assert_eq!(outcome.log.len(), 6);
    assert!(outcome.log.by_round(Round::Final).is_empty());
    assert!(!outcome.conference_champions.contains_key(&Conference::NFC));
}

#[tokio::test]
async fn test_simulation_is_deterministic() {
    let first = run_2022(EngineConfig::default()).await;
    let second = run_2022(EngineConfig::default()).await;
    let sequential = run_2022(EngineConfig {
        parallel_rounds: false,
        ..EngineConfig::default()
    })
    .await;

    assert_eq!(first.log, second.log);
    assert_eq!(first.log, sequential.log);
}

// ---------------------------------------------------------------------------
// Re-seeding scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_top_seed_plays_worst_survivor() {
    let league = bundled_league();
    let advancer = RoundAdvancer::new(&league.registry, OddTeamPolicy::Drop);

    let survivors = vec!["BUF".to_string(), "CIN".to_string()];
    let matchups = advancer
        .next_round(&survivors, Conference::AFC, 2022, Round::Divisional, true)
        .unwrap();

    assert_eq!(matchups.len(), 1);
    assert_eq!((matchups[0].team_a.as_str(), matchups[0].team_b.as_str()), ("KC", "CIN"));
}

#[test]
fn test_nfc_pool_pairs_best_with_worst() {
    let league = nfc_league();
    let advancer = RoundAdvancer::new(&league.registry, OddTeamPolicy::Drop);

    let survivors = vec!["SF".to_string(), "MIN".to_string()];
    let matchups = advancer
        .next_round(&survivors, Conference::NFC, 2022, Round::Divisional, true)
        .unwrap();

    assert_eq!(matchups.len(), 1);
    assert_eq!((matchups[0].team_a.as_str(), matchups[0].team_b.as_str()), ("PHI", "SF"));
}

#[tokio::test]
async fn test_dropped_team_surfaces_as_incomplete_round() {
    let failure: SimulationFailure = engine(nfc_league(), EngineConfig::default())
        .run(
            2022,
            &[wc("SF", "SEA"), wc("MIN", "NYG")],
            BracketScope::Conference(Conference::NFC),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::ConferenceChampionship);
    assert_eq!(
        failure.error,
        BracketError::IncompleteRound {
            season: 2022,
            round: Round::ConferenceChampionship,
            conference: Some(Conference::NFC),
            expected: 2,
            found: 1,
        }
    );
    // SEA < SF, so SEA advances; pool [PHI #1, MIN #2, SEA #7] drops MIN.
    assert_eq!(failure.partial.winners(Round::WildCard), vec!["SEA", "MIN"]);
    assert_eq!(pairs(&failure.partial.by_round(Round::Divisional)), vec![p("PHI", "SEA")]);
    assert!(!failure
        .partial
        .by_round(Round::Divisional)
        .iter()
        .any(|g| g.team_a == "MIN" || g.team_b == "MIN"));
    assert_eq!(failure.partial.len(), 3);
}

#[tokio::test]
async fn test_reject_policy_fails_at_pairing() {
    let config = EngineConfig {
        odd_team_policy: OddTeamPolicy::Reject,
        ..EngineConfig::default()
    };
    let failure = engine(nfc_league(), config)
        .run(
            2022,
            &[wc("SF", "SEA"), wc("MIN", "NYG")],
            BracketScope::Conference(Conference::NFC),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Divisional);
    assert!(matches!(
        failure.error,
        BracketError::IncompleteRound {
            round: Round::Divisional,
            expected: 2,
            found: 3,
            ..
        }
    ));
    assert_eq!(failure.partial.len(), 2);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_prediction_error_keeps_partial_log() {
    let mut league = bundled_league();
    league.predictor = league.predictor.failing_on("MIA");

    let failure = engine(league, EngineConfig::default())
        .run(2022, &wild_card(MATCHUPS_2022_CSV, 2022), BracketScope::Full)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::WildCard);
    match &failure.error {
        BracketError::Prediction {
            season,
            round,
            team_a,
            team_b,
            ..
        } => {
            assert_eq!(*season, 2022);
            assert_eq!(*round, Round::WildCard);
            assert_eq!((team_a.as_str(), team_b.as_str()), ("BUF", "MIA"));
        }
        other => panic!("expected a prediction error, got {other:?}"),
    }
    // JAX-LAC precedes the failed game in generation order.
    assert_eq!(failure.partial.winners(Round::WildCard), vec!["JAX"]);
}

#[tokio::test]
async fn test_duplicate_seed_is_fatal() {
    let records = vec![
        TeamRecord::new(2022, "KC", Conference::AFC, 1),
        TeamRecord::new(2022, "BUF", Conference::AFC, 2),
        TeamRecord::new(2022, "CIN", Conference::AFC, 3),
        TeamRecord::new(2022, "BAL", Conference::AFC, 3),
    ];
    let games = vec![Matchup::new(2022, Round::WildCard, "BUF", "BAL", None)];

    let failure = engine(league_from(records), EngineConfig::default())
        .run(2022, &games, BracketScope::Conference(Conference::AFC))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        BracketError::DuplicateSeed { seed: 3, conference: Conference::AFC, .. }
    ));
    assert!(failure.partial.is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let cancel = CancelFlag::new();
    cancel.cancel();

    let failure = engine(bundled_league(), EngineConfig::default())
        .with_cancel_flag(cancel)
        .run(2022, &wild_card(MATCHUPS_2022_CSV, 2022), BracketScope::Full)
        .await
        .unwrap_err();

    assert_eq!(
        failure.error,
        BracketError::Cancelled {
            season: 2022,
            stage: Stage::WildCard
        }
    );
    assert!(failure.partial.is_empty());
}

async fn run_cancelled_after(predictions: usize) -> SimulationFailure {
    let league = bundled_league();
    let cancel = CancelFlag::new();
    let predictor: Arc<dyn Predictor> = Arc::new(CancellingPredictor::new(
        league.predictor,
        cancel.clone(),
        predictions,
    ));
    BracketEngine::new(league.registry, predictor, EngineConfig::default())
        .with_cancel_flag(cancel)
        .run(2022, &wild_card(MATCHUPS_2022_CSV, 2022), BracketScope::Full)
        .await
        .unwrap_err()
}

#[tokio::test]
async fn test_cancel_during_wild_card_stops_before_divisional() {
    let failure = run_cancelled_after(1).await;

    assert_eq!(failure.stage, Stage::Divisional);
    assert_eq!(
        failure.error,
        BracketError::Cancelled {
            season: 2022,
            stage: Stage::Divisional
        }
    );
    // The round in flight still finishes.
    assert_eq!(failure.partial.len(), 6);
    assert_eq!(failure.partial.by_round(Round::WildCard).len(), 6);
}

#[tokio::test]
async fn test_cancel_during_divisional_stops_before_championship() {
    let failure = run_cancelled_after(7).await;

    assert_eq!(failure.stage, Stage::ConferenceChampionship);
    assert!(matches!(
        failure.error,
        BracketError::Cancelled {
            stage: Stage::ConferenceChampionship,
            ..
        }
    ));
    assert_eq!(failure.partial.len(), 10);
    assert!(failure.partial.by_round(Round::ConferenceChampionship).is_empty());
}

#[tokio::test]
async fn test_cancel_during_final_completes_bracket() {
    // The final is the last stage; there is no transition left to observe the flag.
    let outcome = {
        let league = bundled_league();
        let cancel = CancelFlag::new();
        let predictor: Arc<dyn Predictor> =
            Arc::new(CancellingPredictor::new(league.predictor, cancel.clone(), 13));
        BracketEngine::new(league.registry, predictor, EngineConfig::default())
            .with_cancel_flag(cancel)
            .run(2022, &wild_card(MATCHUPS_2022_CSV, 2022), BracketScope::Full)
            .await
    };
    assert_eq!(outcome.unwrap().log.len(), 13);
}

#[test]
fn test_registry_lookups_are_stable() {
    let league = bundled_league();
    let first = league.registry.seed("CIN", 2022).unwrap();
    let second = league.registry.seed("CIN", 2022).unwrap();
    assert_eq!(first, 3);
    assert_eq!(first, second);
    assert_eq!(league.registry.bye_count(2019), 2);
    assert_eq!(league.registry.bye_count(2022), 1);
}

// ---------------------------------------------------------------------------
// Export and evaluation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_export_round_trip() {
    let outcome = run_2022(EngineConfig::default()).await;
    let path = std::env::temp_dir().join(format!("gridiron_test_{}.csv", Uuid::new_v4()));

    storage::export_results_csv(&outcome.log, &path).unwrap();
    let loaded = storage::load_results_csv(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let key = |g: &gridiron::types::GameResult| {
        (g.season, g.round, g.team_a.clone(), g.team_b.clone(), g.winner.clone())
    };
    let expected: Vec<_> = outcome.log.iter().map(key).collect();
    let actual: Vec<_> = loaded.iter().map(key).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_evaluate_against_real_results() {
    let outcome = run_2022(EngineConfig::default()).await;
    let actual = read_actual_games(MATCHUPS_2022_CSV.as_bytes(), 2022).unwrap();

    let evaluation = evaluate(outcome.log.as_slice(), &actual);

    // JAX, BUF and DAL were the only right picks; no later pairing matched.
    assert_eq!(evaluation.points, 3);
    assert_eq!(evaluation.max_points, 27);
    assert_eq!(evaluation.matched.len(), 6);
    let wrong_picks = evaluation
        .mismatches
        .iter()
        .filter(|m| m.reason == MismatchReason::WrongWildCardPick)
        .count();
    let missed_pairings = evaluation
        .mismatches
        .iter()
        .filter(|m| m.reason == MismatchReason::MatchupMismatch)
        .count();
    assert_eq!(wrong_picks, 3);
    assert_eq!(missed_pairings, 7);
}

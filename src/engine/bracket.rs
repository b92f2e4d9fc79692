//! Bracket engine: the tournament state machine.
//!
//! `WildCard → Divisional → ConferenceChampionship → Final → Complete`.
//! Each stage resolves every matchup of its round (concurrently when
//! enabled), appends the results in generation order, and only then
//! re-pairs the winners for the next stage. Conferences are processed
//! in `Conference::ALL` order, each fully before the next.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info};

use super::advancer::{OddTeamPolicy, RoundAdvancer};
use super::log::ResultLog;
use super::matchup::MatchupBuilder;
use crate::predictor::Predictor;
use crate::registry::TeamRegistry;
use crate::types::{BracketError, Conference, GameResult, Matchup, Round, Season, Stage};

// ---------------------------------------------------------------------------
// Configuration and handles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub odd_team_policy: OddTeamPolicy,
    /// Resolve the matchups of a round concurrently.
    pub parallel_rounds: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            odd_team_policy: OddTeamPolicy::Drop,
            parallel_rounds: true,
        }
    }
}

/// How much of the bracket to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketScope {
    /// Both conferences through the final.
    Full,
    /// One conference, up to its champion.
    Conference(Conference),
}

impl BracketScope {
    pub fn conferences(&self) -> Vec<Conference> {
        match self {
            BracketScope::Full => Conference::ALL.to_vec(),
            BracketScope::Conference(c) => vec![*c],
        }
    }
}

impl fmt::Display for BracketScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketScope::Full => write!(f, "full"),
            BracketScope::Conference(c) => write!(f, "{c}"),
        }
    }
}

/// Cooperative cancellation, checked at every stage transition.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A completed bracket.
#[derive(Debug, Clone)]
pub struct BracketOutcome {
    pub season: Season,
    pub scope: BracketScope,
    /// League champion, or the conference champion for a conference scope.
    pub champion: String,
    pub conference_champions: BTreeMap<Conference, String>,
    pub log: ResultLog,
}

/// A run that aborted. `partial` holds every game resolved before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{stage} aborted: {error}")]
pub struct SimulationFailure {
    #[source]
    pub error: BracketError,
    pub stage: Stage,
    pub partial: ResultLog,
}

/// Winners of one round, tagged with their conference (`None` in the final).
type RoundWinners = Vec<(Option<Conference>, String)>;

fn by_conference(winners: &RoundWinners) -> BTreeMap<Conference, Vec<String>> {
    let mut grouped: BTreeMap<Conference, Vec<String>> = BTreeMap::new();
    for (conference, team) in winners {
        if let Some(c) = conference {
            grouped.entry(*c).or_default().push(team.clone());
        }
    }
    grouped
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct BracketEngine {
    registry: Arc<TeamRegistry>,
    builder: MatchupBuilder,
    config: EngineConfig,
    cancel: CancelFlag,
}

impl BracketEngine {
    pub fn new(
        registry: Arc<TeamRegistry>,
        predictor: Arc<dyn Predictor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            builder: MatchupBuilder::new(registry.clone(), predictor),
            registry,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Share an externally owned cancel flag (e.g. wired to Ctrl+C).
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Simulate a season's bracket from its wild-card matchups.
    pub async fn run(
        &self,
        season: Season,
        wild_card: &[Matchup],
        scope: BracketScope,
    ) -> Result<BracketOutcome, SimulationFailure> {
        info!(
            season,
            %scope,
            predictor = %self.builder.predictor_name(),
            wild_card_games = wild_card.len(),
            "Bracket simulation starting"
        );

        let mut log = ResultLog::new();
        let mut stage = Stage::WildCard;

        match self.run_stages(season, wild_card, scope, &mut log, &mut stage).await {
            Ok((champion, conference_champions)) => {
                info!(season, %scope, champion = %champion, games = log.len(), "Bracket complete");
                Ok(BracketOutcome {
                    season,
                    scope,
                    champion,
                    conference_champions,
                    log,
                })
            }
            Err(e) => {
                error!(season, %stage, error = %e, games = log.len(), "Bracket simulation failed");
                Err(SimulationFailure {
                    error: e,
                    stage,
                    partial: log,
                })
            }
        }
    }

    async fn run_stages(
        &self,
        season: Season,
        wild_card: &[Matchup],
        scope: BracketScope,
        log: &mut ResultLog,
        stage: &mut Stage,
    ) -> Result<(String, BTreeMap<Conference, String>), BracketError> {
        self.registry.validate_seeds(season)?;
        let conferences = scope.conferences();
        let advancer = RoundAdvancer::new(&self.registry, self.config.odd_team_policy);

        // Wild card: externally supplied, grouped per conference.
        self.checkpoint(season, *stage)?;
        let slates = self.wild_card_slates(season, wild_card)?;
        let mut matchups = Vec::new();
        for c in &conferences {
            match slates.get(c) {
                Some(slate) if !slate.is_empty() => matchups.extend(slate.iter().cloned()),
                _ => {
                    return Err(BracketError::IncompleteRound {
                        season,
                        round: Round::WildCard,
                        conference: Some(*c),
                        expected: 2,
                        found: 0,
                    })
                }
            }
        }
        let mut survivors = by_conference(&self.play_round(matchups, log).await?);

        // Divisional: wild-card winners plus the bye seeds, re-paired.
        *stage = stage.next();
        self.checkpoint(season, *stage)?;
        let mut matchups = Vec::new();
        for c in &conferences {
            let teams = survivors.remove(c).unwrap_or_default();
            let round = advancer.next_round(&teams, *c, season, Round::Divisional, true)?;
            if round.is_empty() {
                return Err(BracketError::IncompleteRound {
                    season,
                    round: Round::Divisional,
                    conference: Some(*c),
                    expected: 2,
                    found: teams.len(),
                });
            }
            matchups.extend(round);
        }
        let mut survivors = by_conference(&self.play_round(matchups, log).await?);

        // Conference championship: exactly the two divisional winners.
        *stage = stage.next();
        self.checkpoint(season, *stage)?;
        let mut matchups = Vec::new();
        for c in &conferences {
            let teams = survivors.remove(c).unwrap_or_default();
            if teams.len() != 2 {
                return Err(BracketError::IncompleteRound {
                    season,
                    round: Round::ConferenceChampionship,
                    conference: Some(*c),
                    expected: 2,
                    found: teams.len(),
                });
            }
            matchups.extend(advancer.next_round(&teams, *c, season, Round::ConferenceChampionship, false)?);
        }
        let conference_champions: BTreeMap<Conference, String> = by_conference(&self.play_round(matchups, log).await?)
            .into_iter()
            .filter_map(|(c, mut teams)| teams.pop().map(|t| (c, t)))
            .collect();

        for (c, team) in &conference_champions {
            info!(season, conference = %c, champion = %team, "Conference champion");
        }

        if let BracketScope::Conference(c) = scope {
            let champion = conference_champions.get(&c).cloned().ok_or(BracketError::IncompleteRound {
                season,
                round: Round::ConferenceChampionship,
                conference: Some(c),
                expected: 1,
                found: 0,
            })?;
            *stage = Stage::Complete;
            return Ok((champion, conference_champions));
        }

        // Final: the conference champions, best seed first.
        *stage = stage.next();
        self.checkpoint(season, *stage)?;
        let finalists: Vec<String> = conference_champions.values().cloned().collect();
        let matchup = advancer.pair_finalists(&finalists, season, Round::Final)?;
        let winners = self.play_round(vec![matchup], log).await?;
        let champion = match winners.as_slice() {
            [(_, team)] => team.clone(),
            _ => {
                return Err(BracketError::IncompleteRound {
                    season,
                    round: Round::Final,
                    conference: None,
                    expected: 1,
                    found: winners.len(),
                })
            }
        };

        *stage = stage.next();
        Ok((champion, conference_champions))
    }

    /// Validate the externally supplied wild-card round and group it by conference.
    fn wild_card_slates(
        &self,
        season: Season,
        wild_card: &[Matchup],
    ) -> Result<BTreeMap<Conference, Vec<Matchup>>, BracketError> {
        let mut slates: BTreeMap<Conference, Vec<Matchup>> = BTreeMap::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for matchup in wild_card {
            let invalid = |reason: String| BracketError::InvalidBracket { season, reason };

            if matchup.round != Round::WildCard {
                return Err(invalid(format!("{matchup} is not a wild-card game")));
            }
            if matchup.season != season {
                return Err(invalid(format!("{matchup} belongs to another season")));
            }
            for team in matchup.teams() {
                if !seen.insert(team) {
                    return Err(invalid(format!("{team} appears in more than one wild-card game")));
                }
            }

            let conference_a = self.registry.conference(&matchup.team_a, season)?;
            let conference_b = self.registry.conference(&matchup.team_b, season)?;
            if conference_a != conference_b {
                return Err(invalid(format!("{matchup} crosses conferences")));
            }
            if matchup.conference.is_some_and(|c| c != conference_a) {
                return Err(invalid(format!("{matchup} is labelled with the wrong conference")));
            }

            let mut matchup = matchup.clone();
            matchup.conference = Some(conference_a);
            slates.entry(conference_a).or_default().push(matchup);
        }

        Ok(slates)
    }

    /// Resolve every matchup of a round, then append results in generation
    /// order. Nothing is appended until the whole round has finished; on
    /// failure the results preceding the first failed matchup are kept.
    async fn play_round(
        &self,
        matchups: Vec<Matchup>,
        log: &mut ResultLog,
    ) -> Result<RoundWinners, BracketError> {
        let Some(first) = matchups.first() else {
            return Ok(Vec::new());
        };
        let (season, round) = (first.season, first.round);
        info!(season, %round, games = matchups.len(), "Round starting");

        let outcomes: Vec<Result<GameResult, BracketError>> = if self.config.parallel_rounds {
            join_all(matchups.iter().map(|m| self.builder.resolve(m))).await
        } else {
            let mut outcomes = Vec::with_capacity(matchups.len());
            for m in &matchups {
                let outcome = self.builder.resolve(m).await;
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed {
                    break;
                }
            }
            outcomes
        };

        let mut winners = Vec::with_capacity(matchups.len());
        for (matchup, outcome) in matchups.iter().zip(outcomes) {
            let result = outcome?;
            debug!(game = %result, "Game recorded");
            winners.push((matchup.conference, result.winner.clone()));
            log.append(result);
        }

        info!(season, %round, winners = ?winners.iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>(), "Round complete");
        Ok(winners)
    }

    fn checkpoint(&self, season: Season, stage: Stage) -> Result<(), BracketError> {
        if self.cancel.is_cancelled() {
            return Err(BracketError::Cancelled { season, stage });
        }
        debug!(season, %stage, "Entering stage");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

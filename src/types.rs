//! Shared types for the GRIDIRON bracket simulator.
//!
//! Teams, matchups, rounds, and game results form the data model used
//! across the registry, engine, storage, and backtest modules. They are
//! plain values: created once, passed by reference, never mutated after
//! they are recorded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Playoff season, identified by the year the regular season started.
pub type Season = u16;

// ---------------------------------------------------------------------------
// Conference
// ---------------------------------------------------------------------------

/// Top-level grouping that partitions teams until the final.
///
/// The derived ordering is the processing order used by the engine:
/// every AFC game of a round is resolved before any NFC game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Conference {
    AFC,
    NFC,
}

impl Conference {
    /// All conferences, in processing order.
    pub const ALL: &'static [Conference] = &[Conference::AFC, Conference::NFC];
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conference::AFC => write!(f, "AFC"),
            Conference::NFC => write!(f, "NFC"),
        }
    }
}

/// Parse a conference code (case-insensitive).
impl std::str::FromStr for Conference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "afc" | "american" | "american football conference" => Ok(Conference::AFC),
            "nfc" | "national" | "national football conference" => Ok(Conference::NFC),
            other => anyhow::bail!("Unknown conference: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rounds and engine stages
// ---------------------------------------------------------------------------

/// Ordinal stage of the single-elimination tournament.
///
/// Serialised as its ordinal (1 = wild card ... 4 = final) so exported
/// results line up with the historical matchup files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Round {
    WildCard = 1,
    Divisional = 2,
    ConferenceChampionship = 3,
    Final = 4,
}

impl Round {
    pub const ALL: &'static [Round] = &[
        Round::WildCard,
        Round::Divisional,
        Round::ConferenceChampionship,
        Round::Final,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Round::ALL.iter().copied().find(|r| r.ordinal() == ordinal)
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> u8 {
        round.ordinal()
    }
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Round::from_ordinal(value).ok_or_else(|| format!("invalid round ordinal {value}"))
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::WildCard => write!(f, "Wild Card"),
            Round::Divisional => write!(f, "Divisional"),
            Round::ConferenceChampionship => write!(f, "Conference Championship"),
            Round::Final => write!(f, "Final"),
        }
    }
}

/// State of the bracket engine. Each stage but `Complete` plays one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    WildCard,
    Divisional,
    ConferenceChampionship,
    Final,
    Complete,
}

impl Stage {
    /// The round played in this stage (`None` once complete).
    pub fn round(self) -> Option<Round> {
        match self {
            Stage::WildCard => Some(Round::WildCard),
            Stage::Divisional => Some(Round::Divisional),
            Stage::ConferenceChampionship => Some(Round::ConferenceChampionship),
            Stage::Final => Some(Round::Final),
            Stage::Complete => None,
        }
    }

    pub fn next(self) -> Stage {
        match self {
            Stage::WildCard => Stage::Divisional,
            Stage::Divisional => Stage::ConferenceChampionship,
            Stage::ConferenceChampionship => Stage::Final,
            Stage::Final | Stage::Complete => Stage::Complete,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.round() {
            Some(round) => write!(f, "{round}"),
            None => write!(f, "Complete"),
        }
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// Per-season attributes of one playoff team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecord {
    pub season: Season,
    /// Team code, e.g. "BUF". Unique within a season.
    pub team: String,
    pub conference: Conference,
    /// 1 = best. Unique within a season + conference.
    pub seed: u8,
    /// `Some(false)` marks the 6-team playoff format (two byes per conference).
    pub seven_team_format: Option<bool>,
    /// Numeric features keyed by column name, consumed only by predictors.
    pub features: BTreeMap<String, f64>,
}

impl TeamRecord {
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Minimal record for tests and fixtures; `Seed` is mirrored as a feature.
    pub fn new(season: Season, team: &str, conference: Conference, seed: u8) -> Self {
        let mut features = BTreeMap::new();
        features.insert("Seed".to_string(), f64::from(seed));
        Self {
            season,
            team: team.to_string(),
            conference,
            seed,
            seven_team_format: None,
            features,
        }
    }

    /// Builder-style helper to attach a feature value.
    pub fn with_feature(mut self, name: &str, value: f64) -> Self {
        self.features.insert(name.to_string(), value);
        self
    }
}

impl fmt::Display for TeamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (#{} {})", self.season, self.team, self.seed, self.conference)
    }
}

// ---------------------------------------------------------------------------
// Matchup
// ---------------------------------------------------------------------------

/// A pairing of two teams in one round. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub season: Season,
    pub round: Round,
    pub team_a: String,
    pub team_b: String,
    /// Set for every game before the final.
    pub conference: Option<Conference>,
}

impl Matchup {
    pub fn new(
        season: Season,
        round: Round,
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        conference: Option<Conference>,
    ) -> Self {
        Self {
            season,
            round,
            team_a: team_a.into(),
            team_b: team_b.into(),
            conference,
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    pub fn teams(&self) -> [&str; 2] {
        [&self.team_a, &self.team_b]
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {} vs {}", self.season, self.round, self.team_a, self.team_b)
    }
}

// ---------------------------------------------------------------------------
// Game result
// ---------------------------------------------------------------------------

/// Outcome of one simulated matchup.
///
/// Field names follow the tabular export columns:
/// `Season,Round,Team_A,Team_B,Winner,Confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    #[serde(rename = "Season")]
    pub season: Season,
    #[serde(rename = "Round")]
    pub round: Round,
    #[serde(rename = "Team_A")]
    pub team_a: String,
    #[serde(rename = "Team_B")]
    pub team_b: String,
    #[serde(rename = "Winner")]
    pub winner: String,
    /// Predictor confidence in `winner`, in [0, 1]. Optional in imported files.
    #[serde(rename = "Confidence", default)]
    pub confidence: f64,
}

impl GameResult {
    /// Order-insensitive identity of the pairing, for comparing brackets.
    pub fn pairing(&self) -> (Round, [String; 2]) {
        pairing_key(self.round, &self.team_a, &self.team_b)
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} vs {} -> {} ({:.0}%)",
            self.season,
            self.round,
            self.team_a,
            self.team_b,
            self.winner,
            self.confidence * 100.0,
        )
    }
}

/// Round plus the two team codes in lexical order.
pub fn pairing_key(round: Round, team_a: &str, team_b: &str) -> (Round, [String; 2]) {
    let mut pair = [team_a.to_string(), team_b.to_string()];
    pair.sort();
    (round, pair)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal bracket conditions. None of them are transient, so none are retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BracketError {
    #[error("Team not found: {team} in {season}")]
    TeamNotFound { team: String, season: Season },

    #[error("Seed not found: {conference} #{seed} in {season}")]
    SeedNotFound {
        seed: u8,
        conference: Conference,
        season: Season,
    },

    #[error("Duplicate seed: {team_a} and {team_b} are both {conference} #{seed} in {season}")]
    DuplicateSeed {
        seed: u8,
        conference: Conference,
        season: Season,
        team_a: String,
        team_b: String,
    },

    #[error("Duplicate team record: {team} appears twice in {season}")]
    DuplicateTeam { team: String, season: Season },

    #[error("Prediction failed for {season} {round} {team_a} vs {team_b}: {reason}")]
    Prediction {
        season: Season,
        round: Round,
        team_a: String,
        team_b: String,
        reason: String,
    },

    #[error("Unknown feature column {column:?} requested by predictor {predictor}")]
    UnknownFeatureOrder { column: String, predictor: String },

    #[error(
        "Incomplete {round} in {season} ({}): expected {expected} teams, found {found}",
        scope_label(.conference)
    )]
    IncompleteRound {
        season: Season,
        round: Round,
        conference: Option<Conference>,
        expected: usize,
        found: usize,
    },

    #[error("Invalid bracket for {season}: {reason}")]
    InvalidBracket { season: Season, reason: String },

    #[error("Simulation of {season} cancelled before the {stage}")]
    Cancelled { season: Season, stage: Stage },
}

fn scope_label(conference: &Option<Conference>) -> String {
    match conference {
        Some(c) => c.to_string(),
        None => "league".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Playoff matchup files.
//!
//! The same CSV layout serves two purposes: its round-1 rows seed the
//! simulation, and all of its rows (with `Winner`) are the ground truth a
//! simulation is scored against. Columns: `Round, Team_A, Team_B`, plus
//! optional `Season`, `Conference`, and `Winner`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use super::BracketSource;
use crate::types::{Conference, Matchup, Round, Season};

#[derive(Debug, Deserialize)]
struct MatchupRecord {
    #[serde(rename = "Season", default)]
    season: Option<Season>,
    #[serde(rename = "Round")]
    round: u8,
    #[serde(rename = "Team_A")]
    team_a: String,
    #[serde(rename = "Team_B")]
    team_b: String,
    #[serde(rename = "Conference", default)]
    conference: Option<String>,
    #[serde(rename = "Winner", default)]
    winner: Option<String>,
}

/// A game that was actually played, used as ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualGame {
    pub round: Round,
    pub team_a: String,
    pub team_b: String,
    pub winner: String,
}

pub struct CsvBracketSource {
    path: PathBuf,
}

impl CsvBracketSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BracketSource for CsvBracketSource {
    fn wild_card(&self, season: Season) -> Result<Vec<Matchup>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open bracket file: {}", self.path.display()))?;
        let games = read_wild_card(file, season)
            .with_context(|| format!("Failed to load bracket file: {}", self.path.display()))?;
        info!(path = %self.path.display(), season, games = games.len(), "Wild-card bracket loaded");
        Ok(games)
    }
}

fn read_records<R: Read>(reader: R) -> Result<Vec<MatchupRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for (i, row) in rdr.deserialize::<MatchupRecord>().enumerate() {
        records.push(row.with_context(|| format!("Malformed matchup row at line {}", i + 2))?);
    }
    Ok(records)
}

fn parse_round(ordinal: u8) -> Result<Round> {
    match Round::from_ordinal(ordinal) {
        Some(round) => Ok(round),
        None => bail!("Invalid round ordinal {ordinal}"),
    }
}

/// Round-1 matchups of `season`, in file order. Rows without a `Season`
/// are taken to belong to the requested season.
pub fn read_wild_card<R: Read>(reader: R, season: Season) -> Result<Vec<Matchup>> {
    let mut games = Vec::new();
    for record in read_records(reader)? {
        if record.season.is_some_and(|s| s != season) {
            continue;
        }
        if parse_round(record.round)? != Round::WildCard {
            continue;
        }
        let conference = match record.conference.as_deref().filter(|c| !c.is_empty()) {
            Some(raw) => Some(raw.parse::<Conference>()?),
            None => None,
        };
        games.push(Matchup::new(
            season,
            Round::WildCard,
            record.team_a,
            record.team_b,
            conference,
        ));
    }
    Ok(games)
}

/// Every played game of `season` with a recorded winner.
pub fn read_actual_games<R: Read>(reader: R, season: Season) -> Result<Vec<ActualGame>> {
    let mut games = Vec::new();
    for record in read_records(reader)? {
        if record.season.is_some_and(|s| s != season) {
            continue;
        }
        let round = parse_round(record.round)?;
        let Some(winner) = record.winner.filter(|w| !w.is_empty()) else {
            bail!("{} vs {} has no Winner", record.team_a, record.team_b);
        };
        if winner != record.team_a && winner != record.team_b {
            bail!("Winner {winner} did not play in {} vs {}", record.team_a, record.team_b);
        }
        games.push(ActualGame {
            round,
            team_a: record.team_a,
            team_b: record.team_b,
            winner,
        });
    }
    Ok(games)
}

pub fn load_actual_games(path: &Path, season: Season) -> Result<Vec<ActualGame>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open results file: {}", path.display()))?;
    read_actual_games(file, season)
        .with_context(|| format!("Failed to load results file: {}", path.display()))
}

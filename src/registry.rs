//! Team registry.
//!
//! Read-only lookup of per-season team attributes (seed, conference,
//! features). Built once from the feature data source and shared across
//! the engine and predictor tasks behind an `Arc` without locking.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::types::{BracketError, Conference, Season, TeamRecord};

/// Byes per conference in the 7-team format (the #1 seed only).
const SEVEN_TEAM_BYES: usize = 1;
/// Byes per conference in the 6-team format (the #1 and #2 seeds).
const SIX_TEAM_BYES: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct TeamRegistry {
    /// Season -> team code -> record.
    teams: HashMap<Season, HashMap<String, TeamRecord>>,
}

impl TeamRegistry {
    /// Build a registry, rejecting a (season, team) pair that appears twice.
    pub fn new(records: Vec<TeamRecord>) -> Result<Self, BracketError> {
        let mut teams: HashMap<Season, HashMap<String, TeamRecord>> = HashMap::new();
        for record in records {
            let season_teams = teams.entry(record.season).or_default();
            if season_teams.contains_key(&record.team) {
                return Err(BracketError::DuplicateTeam {
                    team: record.team,
                    season: record.season,
                });
            }
            season_teams.insert(record.team.clone(), record);
        }
        let registry = Self { teams };
        debug!(teams = registry.len(), seasons = registry.teams.len(), "Team registry built");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.teams.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Full record for a team in a season.
    pub fn record(&self, team: &str, season: Season) -> Result<&TeamRecord, BracketError> {
        self.teams
            .get(&season)
            .and_then(|season_teams| season_teams.get(team))
            .ok_or_else(|| BracketError::TeamNotFound {
                team: team.to_string(),
                season,
            })
    }

    pub fn seed(&self, team: &str, season: Season) -> Result<u8, BracketError> {
        self.record(team, season).map(|r| r.seed)
    }

    pub fn conference(&self, team: &str, season: Season) -> Result<Conference, BracketError> {
        self.record(team, season).map(|r| r.conference)
    }

    /// All teams of one conference in a season, best seed first.
    pub fn conference_teams(&self, conference: Conference, season: Season) -> Vec<&TeamRecord> {
        let mut teams: Vec<&TeamRecord> = self
            .season_records(season)
            .filter(|r| r.conference == conference)
            .collect();
        teams.sort_by(|a, b| a.seed.cmp(&b.seed).then_with(|| a.team.cmp(&b.team)));
        teams
    }

    /// Seasons present in the registry, ascending.
    pub fn seasons(&self) -> Vec<Season> {
        let mut seasons: Vec<Season> = self.teams.keys().copied().collect();
        seasons.sort_unstable();
        seasons
    }

    /// The team holding `seed` in a conference.
    pub fn team_with_seed(
        &self,
        conference: Conference,
        season: Season,
        seed: u8,
    ) -> Result<&TeamRecord, BracketError> {
        let mut holders = self
            .conference_teams(conference, season)
            .into_iter()
            .filter(|r| r.seed == seed);

        let first = holders.next().ok_or(BracketError::SeedNotFound {
            seed,
            conference,
            season,
        })?;
        if let Some(second) = holders.next() {
            return Err(BracketError::DuplicateSeed {
                seed,
                conference,
                season,
                team_a: first.team.clone(),
                team_b: second.team.clone(),
            });
        }
        Ok(first)
    }

    /// Number of seeds per conference that skip the wild-card round.
    pub fn bye_count(&self, season: Season) -> usize {
        let six_team = self
            .season_records(season)
            .any(|r| r.seven_team_format == Some(false));
        if six_team {
            SIX_TEAM_BYES
        } else {
            SEVEN_TEAM_BYES
        }
    }

    /// Teams entering at the divisional round, best seed first.
    pub fn bye_teams(
        &self,
        conference: Conference,
        season: Season,
    ) -> Result<Vec<&TeamRecord>, BracketError> {
        (1..=self.bye_count(season) as u8)
            .map(|seed| self.team_with_seed(conference, season, seed))
            .collect()
    }

    /// Fail on the first seed shared by two teams of the same conference.
    pub fn validate_seeds(&self, season: Season) -> Result<(), BracketError> {
        for &conference in Conference::ALL {
            let mut seen: BTreeMap<u8, &str> = BTreeMap::new();
            for record in self.conference_teams(conference, season) {
                if let Some(holder) = seen.insert(record.seed, &record.team) {
                    return Err(BracketError::DuplicateSeed {
                        seed: record.seed,
                        conference,
                        season,
                        team_a: holder.to_string(),
                        team_b: record.team.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn season_records(&self, season: Season) -> impl Iterator<Item = &TeamRecord> {
        self.teams.get(&season).into_iter().flat_map(HashMap::values)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Round advancer: seed re-pairing between rounds.
//!
//! After each round the surviving teams of a conference are re-seeded:
//! best remaining seed plays worst remaining seed, repeatedly, until
//! fewer than two teams are left. Byes are injected only through
//! `include_top_seed_bye`, never created from an odd leftover.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registry::TeamRegistry;
use crate::types::{BracketError, Conference, Matchup, Round, Season};

/// What to do with a team left over after best-vs-worst pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddTeamPolicy {
    /// Drop the leftover with a warning. Fixed-size rounds downstream
    /// then fail with `IncompleteRound`.
    #[default]
    Drop,
    /// Fail immediately with `IncompleteRound`.
    Reject,
}

pub struct RoundAdvancer<'a> {
    registry: &'a TeamRegistry,
    policy: OddTeamPolicy,
}

impl<'a> RoundAdvancer<'a> {
    pub fn new(registry: &'a TeamRegistry, policy: OddTeamPolicy) -> Self {
        Self { registry, policy }
    }

    /// Pair a conference's survivors for `round`.
    ///
    /// With `include_top_seed_bye`, the season's bye seeds (the #1 seed, or
    /// #1 and #2 in the 6-team format) join the pool first. Matchups are
    /// returned best seed first, each with the better seed as team A.
    pub fn next_round(
        &self,
        surviving: &[String],
        conference: Conference,
        season: Season,
        round: Round,
        include_top_seed_bye: bool,
    ) -> Result<Vec<Matchup>, BracketError> {
        let mut pool: Vec<(u8, String)> = Vec::with_capacity(surviving.len() + 2);
        for team in surviving {
            let record = self.registry.record(team, season)?;
            if record.conference != conference {
                return Err(BracketError::InvalidBracket {
                    season,
                    reason: format!(
                        "{team} ({}) cannot advance in the {conference} bracket",
                        record.conference
                    ),
                });
            }
            if pool.iter().any(|(_, t)| t == team) {
                return Err(BracketError::InvalidBracket {
                    season,
                    reason: format!("{team} appears twice among {round} participants"),
                });
            }
            pool.push((record.seed, record.team.clone()));
        }

        if include_top_seed_bye {
            for record in self.registry.bye_teams(conference, season)? {
                if pool.iter().any(|(_, t)| *t == record.team) {
                    return Err(BracketError::InvalidBracket {
                        season,
                        reason: format!("{} holds a bye but also played the previous round", record.team),
                    });
                }
                debug!(season, %conference, team = %record.team, seed = record.seed, "Bye team enters");
                pool.push((record.seed, record.team.clone()));
            }
        }

        pool.sort_by_key(|(seed, _)| *seed);
        if let Some(pair) = pool.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(BracketError::DuplicateSeed {
                seed: pair[0].0,
                conference,
                season,
                team_a: pair[0].1.clone(),
                team_b: pair[1].1.clone(),
            });
        }

        let participants = pool.len();
        let mut pool: VecDeque<(u8, String)> = pool.into();
        let mut matchups = Vec::with_capacity(participants / 2);
        while pool.len() >= 2 {
            if let (Some((_, best)), Some((_, worst))) = (pool.pop_front(), pool.pop_back()) {
                matchups.push(Matchup::new(season, round, best, worst, Some(conference)));
            }
        }

        if let Some((seed, team)) = pool.pop_front() {
            match self.policy {
                OddTeamPolicy::Drop => {
                    warn!(
                        season,
                        %conference,
                        %round,
                        team = %team,
                        seed,
                        "Odd team out after pairing; dropped without a bye"
                    );
                }
                OddTeamPolicy::Reject => {
                    return Err(BracketError::IncompleteRound {
                        season,
                        round,
                        conference: Some(conference),
                        expected: participants - 1,
                        found: participants,
                    });
                }
            }
        }

        Ok(matchups)
    }

    /// Pair exactly two finalists, better seed first.
    ///
    /// Within a conference equal seeds are a `DuplicateSeed`. In the final
    /// the champions may share a seed; the input order (conference
    /// processing order) then decides who is team A.
    pub fn pair_finalists(
        &self,
        finalists: &[String],
        season: Season,
        round: Round,
    ) -> Result<Matchup, BracketError> {
        let conference = match finalists.first() {
            Some(team) if finalists.len() == 2 => self.registry.conference(team, season)?,
            _ => {
                return Err(BracketError::IncompleteRound {
                    season,
                    round,
                    conference: None,
                    expected: 2,
                    found: finalists.len(),
                })
            }
        };

        let mut seeded = Vec::with_capacity(2);
        for team in finalists {
            let record = self.registry.record(team, season)?;
            seeded.push((record.seed, record.conference, record.team.clone()));
        }
        seeded.sort_by_key(|(seed, _, _)| *seed);

        let same_conference = seeded.iter().all(|(_, c, _)| *c == conference);
        if same_conference && seeded[0].0 == seeded[1].0 {
            return Err(BracketError::DuplicateSeed {
                seed: seeded[0].0,
                conference,
                season,
                team_a: seeded[0].2.clone(),
                team_b: seeded[1].2.clone(),
            });
        }

        let [(_, _, team_a), (_, _, team_b)]: [(u8, Conference, String); 2] =
            seeded.try_into().map_err(|_| BracketError::IncompleteRound {
                season,
                round,
                conference: None,
                expected: 2,
                found: finalists.len(),
            })?;

        Ok(Matchup::new(
            season,
            round,
            team_a,
            team_b,
            same_conference.then_some(conference),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

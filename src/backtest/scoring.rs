//! Weighted bracket scoring.
//!
//! Each real wild-card game is worth 1 point for the right winner. Each
//! later-round game is worth 3: 2 for having predicted that pairing at
//! all, 1 more for the right winner. Pairings are compared without
//! regard to which team was listed first.

use std::collections::HashMap;
use std::fmt;

use tracing::info;

use crate::data::bracket::ActualGame;
use crate::types::{pairing_key, GameResult, Round};

const WILD_CARD_WINNER_POINTS: u32 = 1;
const MATCHUP_POINTS: u32 = 2;
const WINNER_POINTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    WrongWildCardPick,
    WrongWinner,
    MatchupMismatch,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::WrongWildCardPick => write!(f, "Wrong Wild Card Pick"),
            MismatchReason::WrongWinner => write!(f, "Wrong Winner"),
            MismatchReason::MatchupMismatch => write!(f, "Matchup Mismatch"),
        }
    }
}

/// A real game the simulation got wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub round: Round,
    pub team_a: String,
    pub team_b: String,
    pub actual_winner: String,
    /// For a matchup mismatch, the first simulated winner of that round.
    pub predicted_winner: Option<String>,
    pub reason: MismatchReason,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} vs {}: actual {}, predicted {} ({})",
            self.round,
            self.team_a,
            self.team_b,
            self.actual_winner,
            self.predicted_winner.as_deref().unwrap_or("None"),
            self.reason,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub points: u32,
    pub max_points: u32,
    pub mismatches: Vec<Mismatch>,
    /// Simulated games that match a real pairing, with whether the pick was right.
    pub matched: Vec<(GameResult, bool)>,
}

impl Evaluation {
    /// Weighted accuracy in [0, 1]; 0 when there is nothing to score.
    pub fn accuracy(&self) -> f64 {
        if self.max_points == 0 {
            0.0
        } else {
            f64::from(self.points) / f64::from(self.max_points)
        }
    }
}

/// Score a simulated bracket against the games actually played.
pub fn evaluate(simulated: &[GameResult], actual: &[ActualGame]) -> Evaluation {
    let lookup: HashMap<(Round, [String; 2]), &GameResult> =
        simulated.iter().map(|g| (g.pairing(), g)).collect();

    let mut points = 0;
    let mut max_points = 0;
    let mut mismatches = Vec::new();
    let mut matched = Vec::new();

    for game in actual {
        let is_wild_card = game.round == Round::WildCard;
        max_points += if is_wild_card {
            WILD_CARD_WINNER_POINTS
        } else {
            MATCHUP_POINTS + WINNER_POINTS
        };

        let mismatch = |predicted: Option<&str>, reason| Mismatch {
            round: game.round,
            team_a: game.team_a.clone(),
            team_b: game.team_b.clone(),
            actual_winner: game.winner.clone(),
            predicted_winner: predicted.map(str::to_string),
            reason,
        };

        match lookup.get(&pairing_key(game.round, &game.team_a, &game.team_b)) {
            Some(sim) => {
                let correct = sim.winner == game.winner;
                matched.push(((*sim).clone(), correct));
                if !is_wild_card {
                    points += MATCHUP_POINTS;
                }
                if correct {
                    points += if is_wild_card { WILD_CARD_WINNER_POINTS } else { WINNER_POINTS };
                } else if is_wild_card {
                    mismatches.push(mismatch(Some(sim.winner.as_str()), MismatchReason::WrongWildCardPick));
                } else {
                    mismatches.push(mismatch(Some(sim.winner.as_str()), MismatchReason::WrongWinner));
                }
            }
            None => {
                let predicted = simulated
                    .iter()
                    .find(|g| g.round == game.round)
                    .map(|g| g.winner.as_str());
                mismatches.push(mismatch(predicted, MismatchReason::MatchupMismatch));
            }
        }
    }

    info!(
        points,
        max_points,
        mismatches = mismatches.len(),
        "Bracket evaluated"
    );

    Evaluation {
        points,
        max_points,
        mismatches,
        matched,
    }
}

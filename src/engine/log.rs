//! Result log: the append-only record of every simulated game.
//!
//! Entries are ordered by (season, round, insertion order). The engine
//! is the only writer: it appends a round's results after the whole
//! round has resolved, so `&mut self` is all the synchronisation needed.

use crate::types::{GameResult, Round};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultLog {
    games: Vec<GameResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: GameResult) {
        debug_assert!(
            self.games
                .last()
                .map_or(true, |last| (last.season, last.round) <= (result.season, result.round)),
            "result log must stay ordered by (season, round)"
        );
        self.games.push(result);
    }

    pub fn as_slice(&self) -> &[GameResult] {
        &self.games
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameResult> {
        self.games.iter()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn last(&self) -> Option<&GameResult> {
        self.games.last()
    }

    pub fn by_round(&self, round: Round) -> Vec<&GameResult> {
        self.games.iter().filter(|g| g.round == round).collect()
    }

    /// Winners of one round, in the order the games were played.
    pub fn winners(&self, round: Round) -> Vec<&str> {
        self.games
            .iter()
            .filter(|g| g.round == round)
            .map(|g| g.winner.as_str())
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResultLog {
    type Item = &'a GameResult;
    type IntoIter = std::slice::Iter<'a, GameResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.games.iter()
    }
}

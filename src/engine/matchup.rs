//! Matchup builder.
//!
//! Presents one pairing to the predictor: assembles the paired feature
//! row in the predictor's declared column order, forwards it, and turns
//! the class probabilities into a winner and a confidence.

use std::sync::Arc;

use tracing::debug;

use crate::predictor::{MatchupRow, Predictor, TEAM_A_PREFIX, TEAM_B_PREFIX};
use crate::registry::TeamRegistry;
use crate::types::{BracketError, GameResult, Matchup};

#[derive(Clone)]
pub struct MatchupBuilder {
    registry: Arc<TeamRegistry>,
    predictor: Arc<dyn Predictor>,
}

impl MatchupBuilder {
    pub fn new(registry: Arc<TeamRegistry>, predictor: Arc<dyn Predictor>) -> Self {
        Self { registry, predictor }
    }

    pub fn predictor_name(&self) -> String {
        self.predictor.name()
    }

    /// Build the feature row for a matchup in the predictor's column order.
    ///
    /// `A_<feature>` columns come from `team_a`, `B_<feature>` from `team_b`.
    /// Any other column name is an `UnknownFeatureOrder`; a feature the team
    /// record lacks is a `Prediction` error, never a default value.
    pub fn build_row(&self, matchup: &Matchup) -> Result<MatchupRow, BracketError> {
        let record_a = self.registry.record(&matchup.team_a, matchup.season)?;
        let record_b = self.registry.record(&matchup.team_b, matchup.season)?;

        let columns = self.predictor.feature_names();
        if columns.is_empty() {
            return Err(self.prediction_error(matchup, "predictor declares no feature columns"));
        }

        let mut values = Vec::with_capacity(columns.len());
        for column in &columns {
            let (record, feature) = if let Some(f) = column.strip_prefix(TEAM_A_PREFIX) {
                (record_a, f)
            } else if let Some(f) = column.strip_prefix(TEAM_B_PREFIX) {
                (record_b, f)
            } else {
                return Err(BracketError::UnknownFeatureOrder {
                    column: column.clone(),
                    predictor: self.predictor.name(),
                });
            };

            let value = record.feature(feature).ok_or_else(|| {
                self.prediction_error(
                    matchup,
                    &format!("missing feature {feature} for {}", record.team),
                )
            })?;
            values.push(value);
        }

        Ok(MatchupRow { columns, values })
    }

    /// Resolve a matchup into a game result.
    pub async fn resolve(&self, matchup: &Matchup) -> Result<GameResult, BracketError> {
        let row = self.build_row(matchup)?;
        let prediction = self
            .predictor
            .predict(&row)
            .await
            .map_err(|e| self.prediction_error(matchup, &e.to_string()))?;

        if !prediction.is_valid() {
            return Err(self.prediction_error(
                matchup,
                &format!("probabilities out of range: {:?}", prediction.probabilities),
            ));
        }

        let winner = if prediction.favors_team_a() {
            &matchup.team_a
        } else {
            &matchup.team_b
        };

        debug!(
            season = matchup.season,
            round = %matchup.round,
            team_a = %matchup.team_a,
            team_b = %matchup.team_b,
            winner = %winner,
            confidence = format!("{:.3}", prediction.confidence()),
            "Matchup resolved"
        );

        Ok(GameResult {
            season: matchup.season,
            round: matchup.round,
            team_a: matchup.team_a.clone(),
            team_b: matchup.team_b.clone(),
            winner: winner.clone(),
            confidence: prediction.confidence(),
        })
    }

    fn prediction_error(&self, matchup: &Matchup, reason: &str) -> BracketError {
        BracketError::Prediction {
            season: matchup.season,
            round: matchup.round,
            team_a: matchup.team_a.clone(),
            team_b: matchup.team_b.clone(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

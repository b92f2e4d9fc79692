//! Win-probability predictors.
//!
//! Defines the `Predictor` trait the engine consumes, plus two bundled
//! implementations: a seed/point-differential heuristic and a logistic
//! model loaded from a JSON artifact. How a model is trained is not this
//! crate's concern; anything that can score a paired feature row works.

pub mod linear;
pub mod seed;

use async_trait::async_trait;

/// Probability index for "team B wins" (training label 0).
pub const TEAM_B_WINS: usize = 0;
/// Probability index for "team A wins" (training label 1).
pub const TEAM_A_WINS: usize = 1;

/// Prefix of columns taken from the first team of a matchup.
pub const TEAM_A_PREFIX: &str = "A_";
/// Prefix of columns taken from the second team of a matchup.
pub const TEAM_B_PREFIX: &str = "B_";

/// One matchup's paired features, in the predictor's declared column order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupRow {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl MatchupRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i).copied())
    }

    /// Like `get`, but a missing column is a `PredictorError`.
    pub fn require(&self, column: &str) -> Result<f64, PredictorError> {
        self.get(column)
            .ok_or_else(|| PredictorError::MissingFeature(column.to_string()))
    }
}

/// Class probabilities for one matchup, indexed by `TEAM_B_WINS` / `TEAM_A_WINS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probabilities: [f64; 2],
}

impl Prediction {
    pub fn from_team_a_probability(p: f64) -> Self {
        let mut probabilities = [0.0; 2];
        probabilities[TEAM_A_WINS] = p;
        probabilities[TEAM_B_WINS] = 1.0 - p;
        Self { probabilities }
    }

    /// Argmax over the classes; an exact tie goes to the first class (team B).
    pub fn favors_team_a(&self) -> bool {
        self.probabilities[TEAM_A_WINS] > self.probabilities[TEAM_B_WINS]
    }

    pub fn confidence(&self) -> f64 {
        self.probabilities[TEAM_A_WINS].max(self.probabilities[TEAM_B_WINS])
    }

    pub fn is_valid(&self) -> bool {
        self.probabilities
            .iter()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictorError {
    #[error("missing feature {0}")]
    MissingFeature(String),

    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("model error: {0}")]
    Model(String),
}

/// Abstraction over win-probability models.
///
/// `feature_names` fixes the column order the model expects; the matchup
/// builder presents every row in exactly that order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Model identifier, used in logs and errors.
    fn name(&self) -> String;

    /// Ordered `A_<feature>` / `B_<feature>` columns.
    fn feature_names(&self) -> Vec<String>;

    /// Score one matchup.
    async fn predict(&self, row: &MatchupRow) -> Result<Prediction, PredictorError>;
}

pub(crate) fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `["A_f1", "B_f1", "A_f2", "B_f2", ...]` for a list of base features.
pub fn paired_columns(features: &[&str]) -> Vec<String> {
    features
        .iter()
        .flat_map(|f| [format!("{TEAM_A_PREFIX}{f}"), format!("{TEAM_B_PREFIX}{f}")])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_from_probability() {
        let p = Prediction::from_team_a_probability(0.7);
        assert!(p.favors_team_a());
        assert!((p.confidence() - 0.7).abs() < 1e-12);
        assert!((p.probabilities[TEAM_B_WINS] - 0.3).abs() < 1e-12);

        let p = Prediction::from_team_a_probability(0.2);
        assert!(!p.favors_team_a());
        assert!((p.confidence() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_tie_goes_to_team_b() {
        let p = Prediction::from_team_a_probability(0.5);
        assert!(!p.favors_team_a());
        assert_eq!(p.confidence(), 0.5);
    }

    #[test]
    fn test_prediction_validity() {
        assert!(Prediction { probabilities: [0.4, 0.6] }.is_valid());
        assert!(!Prediction { probabilities: [f64::NAN, 0.6] }.is_valid());
        assert!(!Prediction { probabilities: [-0.1, 1.1] }.is_valid());
    }

    #[test]
    fn test_row_lookup() {
        let row = MatchupRow {
            columns: paired_columns(&["Seed"]),
            values: vec![1.0, 4.0],
        };
        assert_eq!(row.columns, vec!["A_Seed", "B_Seed"]);
        assert_eq!(row.get("B_Seed"), Some(4.0));
        assert_eq!(
            row.require("A_Wins"),
            Err(PredictorError::MissingFeature("A_Wins".into()))
        );
    }

    #[test]
    fn test_logistic_midpoint() {
        assert!((logistic(0.0) - 0.5).abs() < 1e-12);
        assert!(logistic(5.0) > 0.99);
        assert!(logistic(-5.0) < 0.01);
    }
}

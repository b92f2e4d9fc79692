//! Seed heuristic predictor.
//!
//! Logistic score on seed gap and point differential. Used when no
//! trained model is configured; deterministic and feature-light.

use async_trait::async_trait;

use super::{logistic, paired_columns, MatchupRow, Prediction, Predictor, PredictorError};

#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Log-odds per seed of advantage.
    pub seed_weight: f64,
    /// Log-odds per point of season point-differential advantage.
    pub point_diff_weight: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            seed_weight: 0.35,
            point_diff_weight: 0.01,
        }
    }
}

pub struct SeedPredictor {
    config: SeedConfig,
}

impl SeedPredictor {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    fn uses_point_diff(&self) -> bool {
        self.config.point_diff_weight != 0.0
    }
}

impl Default for SeedPredictor {
    fn default() -> Self {
        Self::new(SeedConfig::default())
    }
}

#[async_trait]
impl Predictor for SeedPredictor {
    fn name(&self) -> String {
        "seed-heuristic".to_string()
    }

    fn feature_names(&self) -> Vec<String> {
        if self.uses_point_diff() {
            paired_columns(&["Seed", "Pt_Differential"])
        } else {
            paired_columns(&["Seed"])
        }
    }

    async fn predict(&self, row: &MatchupRow) -> Result<Prediction, PredictorError> {
        // Lower seed is better, so team A's edge is B's seed minus A's.
        let mut logit = self.config.seed_weight * (row.require("B_Seed")? - row.require("A_Seed")?);
        if self.uses_point_diff() {
            logit += self.config.point_diff_weight
                * (row.require("A_Pt_Differential")? - row.require("B_Pt_Differential")?);
        }
        Ok(Prediction::from_team_a_probability(logistic(logit)))
    }
}

//! Logistic model predictor.
//!
//! Loads a trained linear model (feature list, weights, bias) from a
//! JSON artifact and scores matchups with `sigmoid(w · x + b)`, where
//! the output is the probability that team A wins.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::{logistic, MatchupRow, Prediction, Predictor, PredictorError};

/// Serialised form of a trained logistic model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub name: String,
    /// Column order the weights were fitted against.
    pub features: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

pub struct LinearPredictor {
    model: LinearModel,
}

impl LinearPredictor {
    pub fn new(model: LinearModel) -> Result<Self, PredictorError> {
        if model.features.len() != model.weights.len() {
            return Err(PredictorError::Model(format!(
                "{} declares {} features but {} weights",
                model.name,
                model.features.len(),
                model.weights.len()
            )));
        }
        if model.features.is_empty() {
            return Err(PredictorError::Model(format!("{} has no features", model.name)));
        }
        Ok(Self { model })
    }

    /// Load a model artifact from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        let model: LinearModel = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
        let predictor = Self::new(model)?;
        info!(
            model = %predictor.model.name,
            features = predictor.model.features.len(),
            "Linear model loaded"
        );
        Ok(predictor)
    }
}

#[async_trait]
impl Predictor for LinearPredictor {
    fn name(&self) -> String {
        self.model.name.clone()
    }

    fn feature_names(&self) -> Vec<String> {
        self.model.features.clone()
    }

    async fn predict(&self, row: &MatchupRow) -> Result<Prediction, PredictorError> {
        if row.columns != self.model.features {
            return Err(PredictorError::Model(format!(
                "row columns do not match the fitted order of {}",
                self.model.name
            )));
        }
        let z: f64 = row
            .values
            .iter()
            .zip(&self.model.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.model.bias;
        let p = logistic(z);
        if !p.is_finite() {
            return Err(PredictorError::InvalidOutput(format!("non-finite score {z}")));
        }
        Ok(Prediction::from_team_a_probability(p))
    }
}

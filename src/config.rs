//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Data paths may contain a `{season}` placeholder that is filled in per
//! run.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::advancer::OddTeamPolicy;
use crate::engine::bracket::EngineConfig;
use crate::predictor::linear::LinearPredictor;
use crate::predictor::seed::{SeedConfig, SeedPredictor};
use crate::predictor::Predictor;
use crate::types::Season;

const SEASON_PLACEHOLDER: &str = "{season}";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub odd_team_policy: OddTeamPolicy,
    #[serde(default = "default_true")]
    pub parallel_rounds: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            odd_team_policy: OddTeamPolicy::default(),
            parallel_rounds: true,
        }
    }
}

impl SimulationConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            odd_team_policy: self.odd_team_policy,
            parallel_rounds: self.parallel_rounds,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub features_path: String,
    /// Round-1 matchups; `{season}` is substituted.
    pub bracket_path: String,
    /// Real results for evaluation; `{season}` is substituted.
    pub truth_path: String,
    pub results_dir: String,
}

impl DataConfig {
    pub fn features_path(&self) -> PathBuf {
        PathBuf::from(&self.features_path)
    }

    pub fn bracket_path(&self, season: Season) -> PathBuf {
        with_season(&self.bracket_path, season)
    }

    pub fn truth_path(&self, season: Season) -> PathBuf {
        with_season(&self.truth_path, season)
    }

    /// Default CSV export location for a season's simulation.
    pub fn results_path(&self, season: Season) -> PathBuf {
        PathBuf::from(&self.results_dir).join(format!("simulated_results_{season}.csv"))
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PredictorKind {
    #[default]
    Seed,
    Linear,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictorConfig {
    #[serde(default)]
    pub kind: PredictorKind,
    /// JSON model artifact, required for `kind = "linear"`.
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default = "default_seed_weight")]
    pub seed_weight: f64,
    #[serde(default = "default_point_diff_weight")]
    pub point_diff_weight: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            kind: PredictorKind::default(),
            model_path: None,
            seed_weight: default_seed_weight(),
            point_diff_weight: default_point_diff_weight(),
        }
    }
}

impl PredictorConfig {
    pub fn seed_config(&self) -> SeedConfig {
        SeedConfig {
            seed_weight: self.seed_weight,
            point_diff_weight: self.point_diff_weight,
        }
    }

    /// Instantiate the configured predictor.
    pub fn build(&self) -> Result<Arc<dyn Predictor>> {
        match self.kind {
            PredictorKind::Seed => Ok(Arc::new(SeedPredictor::new(self.seed_config()))),
            PredictorKind::Linear => {
                let Some(path) = self.model_path.as_deref() else {
                    bail!("predictor.kind = \"linear\" requires predictor.model_path");
                };
                Ok(Arc::new(LinearPredictor::load(Path::new(path))?))
            }
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_seed_weight() -> f64 {
    SeedConfig::default().seed_weight
}

fn default_point_diff_weight() -> f64 {
    SeedConfig::default().point_diff_weight
}

fn with_season(template: &str, season: Season) -> PathBuf {
    PathBuf::from(template.replace(SEASON_PLACEHOLDER, &season.to_string()))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

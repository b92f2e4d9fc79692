//! Input data sources.
//!
//! Defines the `FeatureSource` and `BracketSource` traits and their CSV
//! implementations: per-team season features (seed, conference, model
//! features) and the historical playoff matchup files.

pub mod bracket;
pub mod features;

use anyhow::Result;

use crate::types::{Matchup, Season, TeamRecord};

/// Produces the per-(season, team) records backing the team registry.
pub trait FeatureSource {
    fn load(&self) -> Result<Vec<TeamRecord>>;
}

/// Produces the externally seeded first round of a season.
pub trait BracketSource {
    /// Wild-card matchups of `season`, in source order.
    fn wild_card(&self, season: Season) -> Result<Vec<Matchup>>;
}

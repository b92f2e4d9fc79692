//! Team feature CSV loader.
//!
//! One row per (season, team). `Season`, `Team`, `Conference`, and `Seed`
//! are required; every other column is read as a numeric feature.
//! `TRUE`/`FALSE` become 1/0, and values that do not parse as numbers are
//! left out (a predictor that needs them fails loudly later).

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::FeatureSource;
use crate::types::{Conference, Season, TeamRecord};

pub const REQUIRED_COLUMNS: &[&str] = &["Season", "Team", "Conference", "Seed"];

/// Flag column distinguishing the 7-team playoff format from the 6-team one.
pub const FORMAT_COLUMN: &str = "Format_7Team";

pub struct CsvFeatureSource {
    path: PathBuf,
}

impl CsvFeatureSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeatureSource for CsvFeatureSource {
    fn load(&self) -> Result<Vec<TeamRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open feature data: {}", self.path.display()))?;
        let records = read_team_records(file)
            .with_context(|| format!("Failed to load feature data: {}", self.path.display()))?;
        info!(path = %self.path.display(), teams = records.len(), "Feature data loaded");
        Ok(records)
    }
}

/// Parse team records from CSV text.
pub fn read_team_records<R: Read>(reader: R) -> Result<Vec<TeamRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        bail!("Missing columns in feature data: {}", missing.join(", "));
    }
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
    let (season_col, team_col, conf_col, seed_col) =
        (column("Season"), column("Team"), column("Conference"), column("Seed"));

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("Malformed row at line {line}"))?;
        let field = |idx: usize| row.get(idx).unwrap_or_default();

        let season = field(season_col)
            .parse::<Season>()
            .with_context(|| format!("Invalid Season at line {line}: {:?}", field(season_col)))?;
        let team = field(team_col).to_string();
        if team.is_empty() {
            bail!("Empty Team at line {line}");
        }
        let conference = field(conf_col)
            .parse::<Conference>()
            .with_context(|| format!("Invalid Conference for {team} at line {line}"))?;
        let seed = parse_seed(field(seed_col))
            .with_context(|| format!("Invalid Seed for {team} at line {line}: {:?}", field(seed_col)))?;

        let mut features = BTreeMap::new();
        for (idx, name) in headers.iter().enumerate() {
            if idx == season_col || idx == team_col || idx == conf_col {
                continue;
            }
            match parse_feature(field(idx)) {
                Some(value) => {
                    features.insert(name.to_string(), value);
                }
                None => debug!(team = %team, season, column = name, "Non-numeric feature skipped"),
            }
        }
        let seven_team_format = features.get(FORMAT_COLUMN).map(|v| *v != 0.0);

        records.push(TeamRecord {
            season,
            team,
            conference,
            seed,
            seven_team_format,
            features,
        });
    }

    Ok(records)
}

fn parse_seed(raw: &str) -> Result<u8> {
    let seed: u8 = match raw.parse::<u8>() {
        Ok(seed) => seed,
        // Spreadsheet exports sometimes write integers as "3.0".
        Err(_) => {
            let value: f64 = raw.parse()?;
            if value.fract() != 0.0 || !(1.0..=255.0).contains(&value) {
                bail!("not a whole seed number");
            }
            value as u8
        }
    };
    if seed == 0 {
        bail!("seeds start at 1");
    }
    Ok(seed)
}

/// Numeric value of a feature cell, `None` when it is blank or non-numeric.
pub fn parse_feature(raw: &str) -> Option<f64> {
    match raw.to_ascii_uppercase().as_str() {
        "TRUE" => Some(1.0),
        "FALSE" => Some(0.0),
        _ => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

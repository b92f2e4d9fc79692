//! Persistence layer.
//!
//! Exports a result log to the tabular `Season,Round,Team_A,Team_B,
//! Winner,Confidence` CSV that downstream scoring consumes, reads it back,
//! and writes a small JSON summary for each run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::log::ResultLog;
use crate::types::{GameResult, Season};

/// Write results as CSV, header first.
pub fn write_results<W: Write>(writer: W, results: &[GameResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in results {
        wtr.serialize(result).context("Failed to serialise game result")?;
    }
    wtr.flush().context("Failed to flush results")?;
    Ok(())
}

/// Read results written by `write_results` (the `Confidence` column is optional).
pub fn read_results<R: Read>(reader: R) -> Result<Vec<GameResult>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut results = Vec::new();
    for (i, row) in rdr.deserialize::<GameResult>().enumerate() {
        results.push(row.with_context(|| format!("Malformed result row at line {}", i + 2))?);
    }
    Ok(results)
}

/// Export a result log to a CSV file, creating parent directories.
pub fn export_results_csv(log: &ResultLog, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_results(file, log.as_slice())?;
    info!(path = %path.display(), games = log.len(), "Results exported");
    Ok(())
}

pub fn load_results_csv(path: &Path) -> Result<Vec<GameResult>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_results(file).with_context(|| format!("Failed to read results from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// JSON record of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub season: Season,
    pub scope: String,
    pub predictor: String,
    pub games: usize,
    pub champion: Option<String>,
    /// Stage and error message when the run aborted.
    pub failure: Option<String>,
}

impl RunSummary {
    pub fn new(season: Season, scope: &str, predictor: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            season,
            scope: scope.to_string(),
            predictor: predictor.to_string(),
            games: 0,
            champion: None,
            failure: None,
        }
    }
}

pub fn save_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(summary).context("Failed to serialise run summary")?;
    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write run summary to {}", path.display()))?;
    debug!(path = %path.display(), run_id = %summary.run_id, "Run summary saved");
    Ok(())
}

pub fn load_summary(path: &Path) -> Result<RunSummary> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run summary from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse run summary from {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

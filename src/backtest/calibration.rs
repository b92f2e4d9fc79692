//! Calibration module.
//!
//! Measures how well predictor confidence matches reality: when the
//! engine says 70%, the favoured team should win about 70% of the time.
//! Computes Brier scores overall and per round, plus a reliability curve.

use std::collections::BTreeMap;

use crate::types::{GameResult, Round};

// ---------------------------------------------------------------------------
// Calibration data
// ---------------------------------------------------------------------------

/// One predicted game with a known outcome.
#[derive(Debug, Clone)]
pub struct CalibrationPoint {
    pub round: Round,
    /// Confidence in the predicted winner, in [0, 1].
    pub confidence: f64,
    pub correct: bool,
}

impl CalibrationPoint {
    pub fn from_result(result: &GameResult, correct: bool) -> Self {
        Self {
            round: result.round,
            confidence: result.confidence,
            correct,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub total_predictions: usize,
    pub overall_brier: f64,
    pub round_brier: BTreeMap<Round, f64>,
    /// One bucket per 10% confidence band.
    pub calibration_curve: Vec<CalibrationBucket>,
    pub diagnosis: CalibrationDiagnosis,
}

#[derive(Debug, Clone)]
pub struct CalibrationBucket {
    pub bin_start: f64,
    pub bin_end: f64,
    pub mean_confidence: f64,
    pub hit_rate: f64,
    pub count: usize,
    /// |mean_confidence - hit_rate|
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationDiagnosis {
    WellCalibrated,
    /// Favourites win less often than the confidence claims.
    OverConfident,
    /// Favourites win more often than the confidence claims.
    UnderConfident,
    InsufficientData,
}

// ---------------------------------------------------------------------------
// Calibrator
// ---------------------------------------------------------------------------

pub struct Calibrator {
    points: Vec<CalibrationPoint>,
    num_bins: usize,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            num_bins: 10,
        }
    }

    pub fn add_point(&mut self, point: CalibrationPoint) {
        self.points.push(point);
    }

    pub fn add_points(&mut self, points: impl IntoIterator<Item = CalibrationPoint>) {
        self.points.extend(points);
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn report(&self) -> CalibrationReport {
        if self.points.is_empty() {
            return CalibrationReport {
                total_predictions: 0,
                overall_brier: 0.0,
                round_brier: BTreeMap::new(),
                calibration_curve: Vec::new(),
                diagnosis: CalibrationDiagnosis::InsufficientData,
            };
        }

        let mut by_round: BTreeMap<Round, Vec<&CalibrationPoint>> = BTreeMap::new();
        for p in &self.points {
            by_round.entry(p.round).or_default().push(p);
        }
        let round_brier = by_round
            .into_iter()
            .map(|(round, points)| (round, brier(points)))
            .collect();

        let calibration_curve = self.compute_calibration_curve();
        let diagnosis = self.diagnose(&calibration_curve);

        CalibrationReport {
            total_predictions: self.points.len(),
            overall_brier: brier(&self.points),
            round_brier,
            calibration_curve,
            diagnosis,
        }
    }

    fn compute_calibration_curve(&self) -> Vec<CalibrationBucket> {
        let bin_width = 1.0 / self.num_bins as f64;
        (0..self.num_bins)
            .map(|i| {
                let bin_start = i as f64 * bin_width;
                let bin_end = bin_start + bin_width;
                let last = i == self.num_bins - 1;
                let in_bin: Vec<&CalibrationPoint> = self
                    .points
                    .iter()
                    .filter(|p| p.confidence >= bin_start && (p.confidence < bin_end || (last && p.confidence <= bin_end)))
                    .collect();

                if in_bin.is_empty() {
                    return CalibrationBucket {
                        bin_start,
                        bin_end,
                        mean_confidence: (bin_start + bin_end) / 2.0,
                        hit_rate: 0.0,
                        count: 0,
                        deviation: 0.0,
                    };
                }

                let count = in_bin.len();
                let mean_confidence = in_bin.iter().map(|p| p.confidence).sum::<f64>() / count as f64;
                let hit_rate = in_bin.iter().filter(|p| p.correct).count() as f64 / count as f64;
                CalibrationBucket {
                    bin_start,
                    bin_end,
                    mean_confidence,
                    hit_rate,
                    count,
                    deviation: (mean_confidence - hit_rate).abs(),
                }
            })
            .collect()
    }

    fn diagnose(&self, curve: &[CalibrationBucket]) -> CalibrationDiagnosis {
        let populated: Vec<&CalibrationBucket> = curve.iter().filter(|b| b.count >= 3).collect();
        if populated.len() < 2 || self.points.len() < 20 {
            return CalibrationDiagnosis::InsufficientData;
        }

        let mut over = 0;
        let mut under = 0;
        for bucket in populated.iter().filter(|b| b.deviation >= 0.05) {
            if bucket.hit_rate < bucket.mean_confidence {
                over += 1;
            } else {
                under += 1;
            }
        }

        if over > under + 1 {
            CalibrationDiagnosis::OverConfident
        } else if under > over + 1 {
            CalibrationDiagnosis::UnderConfident
        } else {
            CalibrationDiagnosis::WellCalibrated
        }
    }
}

/// Mean squared error of confidence against the 0/1 outcome.
fn brier<'a>(points: impl IntoIterator<Item = &'a CalibrationPoint>) -> f64 {
    let (sum, n) = points.into_iter().fold((0.0, 0usize), |(sum, n), p| {
        let outcome = if p.correct { 1.0 } else { 0.0 };
        (sum + (p.confidence - outcome).powi(2), n + 1)
    });
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

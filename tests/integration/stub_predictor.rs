//! Deterministic stub predictor for integration testing.
//!
//! Always picks the lexicographically first team code. Team identity
//! reaches the predictor through a `Name_Order` feature, the team's
//! index in the sorted list of all team codes.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use gridiron::engine::bracket::CancelFlag;
use gridiron::predictor::{MatchupRow, Prediction, Predictor, PredictorError};
use gridiron::types::TeamRecord;

pub const NAME_ORDER: &str = "Name_Order";

/// Confidence reported for every pick.
pub const STUB_CONFIDENCE: f64 = 0.75;

/// Attach `Name_Order` to every record and return the sorted team codes.
pub fn tag_name_order(records: &mut [TeamRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().map(|r| r.team.clone()).collect();
    names.sort();
    names.dedup();
    for record in records.iter_mut() {
        if let Ok(idx) = names.binary_search(&record.team) {
            record.features.insert(NAME_ORDER.to_string(), idx as f64);
        }
    }
    names
}

pub struct LexicographicPredictor {
    names: Vec<String>,
    /// Fail any matchup involving this team.
    fail_on: Option<String>,
}

impl LexicographicPredictor {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, team: &str) -> Self {
        self.fail_on = Some(team.to_string());
        self
    }

    fn name_at(&self, order: f64) -> Result<&str, PredictorError> {
        self.names
            .get(order as usize)
            .map(String::as_str)
            .ok_or_else(|| PredictorError::InvalidOutput(format!("unknown name order {order}")))
    }
}

#[async_trait]
impl Predictor for LexicographicPredictor {
    fn name(&self) -> String {
        "lexicographic-stub".to_string()
    }

    fn feature_names(&self) -> Vec<String> {
        vec![format!("A_{NAME_ORDER}"), format!("B_{NAME_ORDER}")]
    }

    async fn predict(&self, row: &MatchupRow) -> Result<Prediction, PredictorError> {
        let a = row.require(&format!("A_{NAME_ORDER}"))?;
        let b = row.require(&format!("B_{NAME_ORDER}"))?;
        let (team_a, team_b) = (self.name_at(a)?, self.name_at(b)?);

        if let Some(bad) = &self.fail_on {
            if team_a == bad || team_b == bad {
                return Err(PredictorError::Model(format!("no model output for {bad}")));
            }
        }

        let p = if team_a < team_b {
            STUB_CONFIDENCE
        } else {
            1.0 - STUB_CONFIDENCE
        };
        Ok(Prediction::from_team_a_probability(p))
    }
}

/// Wraps another predictor and raises a cancel flag once `after`
/// predictions have been made, simulating a Ctrl+C mid-run.
pub struct CancellingPredictor<P> {
    inner: P,
    cancel: CancelFlag,
    after: usize,
    calls: AtomicUsize,
}

impl<P: Predictor> CancellingPredictor<P> {
    pub fn new(inner: P, cancel: CancelFlag, after: usize) -> Self {
        Self {
            inner,
            cancel,
            after,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<P: Predictor> Predictor for CancellingPredictor<P> {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn feature_names(&self) -> Vec<String> {
        self.inner.feature_names()
    }

    async fn predict(&self, row: &MatchupRow) -> Result<Prediction, PredictorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.cancel.cancel();
        }
        self.inner.predict(row).await
    }
}

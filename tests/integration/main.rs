//! End-to-end bracket simulation tests.

mod bracket_simulation;
mod stub_predictor;

//! Backtesting: scoring a simulated bracket against what actually happened.

pub mod calibration;
pub mod scoring;

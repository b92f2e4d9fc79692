//! GRIDIRON — Seeded playoff bracket simulator
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod registry;
pub mod predictor;
pub mod data;
pub mod engine;
pub mod storage;
pub mod backtest;

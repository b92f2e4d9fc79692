//! Core engine: matchup resolution, seed re-pairing, the round-by-round
//! bracket state machine, and the result log it produces.

pub mod advancer;
pub mod bracket;
pub mod log;
pub mod matchup;

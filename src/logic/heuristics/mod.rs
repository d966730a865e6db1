//! Heuristic Predictor
//!
//! - `weights.rs` — calibrated weights table + artifact format
//! - `rules.rs` — local rule evaluation (no external calls)

pub mod rules;
pub mod weights;

pub use rules::{evaluate_local, HeuristicOutcome};
pub use weights::{WeightsArtifact, WeightsTable};

//! Heuristic recommendation scorer
//!
//! Pipeline: normalize answers -> detect wants -> infer budget tier ->
//! progressive filtering -> weighted scoring -> stable rank + dedupe ->
//! padding -> templated reasons and image refs. Pure and synchronous.

pub mod budget;
pub mod scorer;
pub mod signals;
pub mod weights;

pub use budget::infer_budget_tier;
pub use scorer::{Analysis, PICK_COUNT, Pick, ScoredItem, Scorer, reason_for};
pub use signals::{KeywordDetector, SignalDetector, Want, Wants};
pub use weights::ScoreWeights;

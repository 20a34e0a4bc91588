//! specqa-confidence
//!
//! Model-free reliability estimate for a generated answer. Four factors
//! (retrieval strength, grounding in the retrieved text, technical
//! specificity, hedging language) are scored independently and combined
//! with fixed weights.

pub mod score;
pub mod scorer;

pub use score::{Breakdown, ConfidenceLabel, ConfidenceScore, Weights, WEIGHTS};
pub use scorer::ConfidenceScorer;

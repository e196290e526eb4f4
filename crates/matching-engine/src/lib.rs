//! Opportunity Matching Engine
//!
//! Deterministic multi-factor scoring of opportunities against a user
//! profile, plus ranking with tier and priority assignment.

pub mod engine;
pub mod synonyms;

pub use engine::{MatchingEngine, ScoringWeights};
pub use synonyms::SynonymTable;

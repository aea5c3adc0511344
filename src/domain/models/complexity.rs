//! Complexity analysis domain model.
//!
//! Scoring itself lives in [`crate::domain::complexity`]; this module
//! holds the result shape and the signals that justify it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Uncertain,
    Complex,
}

/// The individual contributions that were summed into the total score,
/// kept around for the reasoning text and for audit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComplexitySignals {
    pub description_length: usize,
    pub checkbox_count: usize,
    pub file_mention_count: usize,
    pub code_block_count: usize,
    pub dependency_mention_count: usize,
    pub refactor_keyword_hits: usize,
    pub architecture_keyword_hits: usize,
    pub multi_component_keyword_hits: usize,
    pub has_complexity_label: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    pub level: ComplexityLevel,
    /// Bounded to `[0, 65]`.
    pub score: u32,
    pub confidence: f64,
    pub reasoning: String,
    pub signals: ComplexitySignals,
}

//! Merge-conflict complexity model.

use serde::{Deserialize, Serialize};

/// Input metrics gathered about one PR's merge conflicts. Callers populate
/// this from forge data; scoring itself is a pure function over this struct.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConflictMetrics {
    pub conflicted_files: u32,
    pub conflict_markers: u32,
    pub lines_affected: u32,
    pub files_overlap: bool,
    pub age_days: i64,
    pub commits_behind: u32,
    pub total_files_changed: u32,
    pub core_files_affected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    AutoResolve,
    ManualFix,
    CloseAndRecreate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictAnalysis {
    /// Bounded to `[0, 55]`.
    pub score: u32,
    pub recommended_action: ConflictResolution,
    pub reasoning: String,
    pub metrics: ConflictMetrics,
}

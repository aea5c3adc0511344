//! Escalation decision model.

use serde::{Deserialize, Serialize};

/// What an agent observed while working a task, handed to
/// [`crate::domain::escalation::should_escalate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationContext {
    pub files_affected: u32,
    pub components_touched: Vec<String>,
    pub failed_attempts: u32,
    pub time_spent_minutes: f64,
    pub discovered_dependencies: u32,
    pub architecture_changes_needed: bool,
    pub requires_coordination: bool,
    pub is_stuck: bool,
    pub blocker_description: Option<String>,
}

/// Next step the calling worker should take after an escalation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationNextAction {
    WaitForCoordinator,
    Continue,
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationResult {
    pub escalated: bool,
    pub coordinator_plan_id: Option<String>,
    pub sub_issues_created: Vec<u64>,
    pub message: String,
    pub next_action: EscalationNextAction,
}

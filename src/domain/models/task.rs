//! Sub-task domain model.
//!
//! A `SubTask` is a unit of work inside an [`crate::domain::models::plan::ExecutionPlan`].
//! Sub-tasks form a DAG via `depends_on`, which references only sibling
//! ids within the same plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};

/// Status of a sub-task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
    Failed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
        }
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// `pending -> in_progress -> {completed | failed | blocked}`;
    /// `blocked -> pending` is allowed after adaptation (see
    /// [`crate::application::scheduler::Scheduler::adapt_blocked_task`]).
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::InProgress, Self::Blocked)
                | (Self::Blocked, Self::Pending)
        )
    }
}

/// A discrete unit of work inside an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Priority in `[1, 5]`, 5 highest.
    pub priority: u8,
    pub estimated_effort_minutes: u32,
    /// Ids of sibling tasks that must complete before this one is ready.
    pub depends_on: Vec<Uuid>,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub blocker: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            priority: 3,
            estimated_effort_minutes: 60,
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            assigned_to: None,
            blocker: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Clip `priority` to `[1, 5]` and `estimated_effort_minutes` to
    /// `[1, 480]` (8 hours), as required of Planner-sanitized fields.
    pub fn sanitize(&mut self) {
        self.priority = self.priority.clamp(1, 5);
        self.estimated_effort_minutes = self.estimated_effort_minutes.clamp(1, 8 * 60);
    }

    /// Reject a dependency on oneself; callers must also verify sibling
    /// membership at the plan level (a single task can't see its siblings).
    pub fn add_dependency(&mut self, dep: Uuid) -> CoreResult<()> {
        if dep == self.id {
            return Err(CoreError::ValidationError(format!(
                "task {} cannot depend on itself",
                self.id
            )));
        }
        if !self.depends_on.contains(&dep) {
            self.depends_on.push(dep);
        }
        Ok(())
    }

    pub fn transition(&mut self, next: TaskStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::ValidationError(format!(
                "invalid status transition from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_pending_with_default_priority() {
        let task = SubTask::new("Implement foo", "do the thing");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, 3);
    }

    #[test]
    fn sanitize_clips_priority_and_effort() {
        let mut task = SubTask::new("t", "d");
        task.priority = 9;
        task.estimated_effort_minutes = 10_000;
        task.sanitize();
        assert_eq!(task.priority, 5);
        assert_eq!(task.estimated_effort_minutes, 480);
    }

    #[test]
    fn cannot_depend_on_self() {
        let mut task = SubTask::new("t", "d");
        let id = task.id;
        assert!(task.add_dependency(id).is_err());
    }

    #[test]
    fn valid_transitions_succeed() {
        let mut task = SubTask::new("t", "d");
        assert!(task.transition(TaskStatus::InProgress).is_ok());
        assert!(task.transition(TaskStatus::Completed).is_ok());
    }

    #[test]
    fn invalid_transition_rejected() {
        let mut task = SubTask::new("t", "d");
        assert!(task.transition(TaskStatus::Completed).is_err());
    }

    #[test]
    fn blocked_can_return_to_pending() {
        let mut task = SubTask::new("t", "d");
        task.transition(TaskStatus::InProgress).unwrap();
        task.transition(TaskStatus::Blocked).unwrap();
        assert!(task.transition(TaskStatus::Pending).is_ok());
    }
}

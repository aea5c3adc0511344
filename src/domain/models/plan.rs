//! Execution plan domain model.
//!
//! An `ExecutionPlan` is the DAG of sub-tasks decomposed from one issue by
//! the [`crate::application::planner::Planner`] (C7). The plan owns its
//! tasks exclusively; the dependency adjacency is derived and kept
//! consistent with the tasks on every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};

use super::dag::TaskDag;
use super::task::{SubTask, TaskStatus};

/// Lifecycle status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Planning,
    Executing,
    Paused,
    Completed,
    Failed,
}

impl Default for PlanStatus {
    fn default() -> Self {
        Self::Planning
    }
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// The DAG of sub-tasks derived from one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: Uuid,
    /// `(owner, repo, number)` of the originating issue.
    pub issue_owner: String,
    pub issue_repo: String,
    pub issue_number: u64,
    pub tasks: Vec<SubTask>,
    pub required_roles: HashSet<String>,
    pub status: PlanStatus,
    pub plan_priority: u8,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn new(issue_owner: impl Into<String>, issue_repo: impl Into<String>, issue_number: u64) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            issue_owner: issue_owner.into(),
            issue_repo: issue_repo.into(),
            issue_number,
            tasks: Vec::new(),
            required_roles: HashSet::new(),
            status: PlanStatus::Planning,
            plan_priority: 1,
            labels: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Sum of every task's estimated effort, in minutes.
    pub fn total_estimated_effort(&self) -> u32 {
        self.tasks.iter().map(|t| t.estimated_effort_minutes).sum()
    }

    /// `100 * completed / total`, `0` when there are no tasks.
    pub fn completion_percentage(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let completed = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        ((completed * 100) / self.tasks.len()) as u8
    }

    /// Rebuild and validate the dependency graph. Must be called after any
    /// structural mutation (adding/removing tasks or edges); callers that
    /// skip this can leave `status` machinery observing a stale DAG.
    pub fn dependency_graph(&self) -> CoreResult<TaskDag> {
        TaskDag::from_tasks(&self.tasks).map_err(|e| CoreError::ValidationError(e.to_string()))
    }

    pub fn find_task_mut(&mut self, id: Uuid) -> Option<&mut SubTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn find_task(&self, id: Uuid) -> Option<&SubTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// `plan.status == Completed` iff every task is `Completed` — enforced
    /// here rather than trusted from callers.
    pub fn refresh_status(&mut self) {
        if self.status == PlanStatus::Failed {
            return;
        }
        if !self.tasks.is_empty() && self.tasks.iter().all(|t| t.status == TaskStatus::Completed) {
            self.status = PlanStatus::Completed;
        } else if self.tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
            self.status = PlanStatus::Executing;
        }
    }

    /// Insert a new high-priority "resolve blocker" task immediately before
    /// `blocked_task_id`, giving the blocked task a dependency on it and
    /// recording the blocker description (spec §4.9 adaptation rule).
    pub fn insert_blocker_resolution(
        &mut self,
        blocked_task_id: Uuid,
        blocker_description: impl Into<String>,
    ) -> CoreResult<Uuid> {
        let blocker_description = blocker_description.into();
        let blocked_idx = self
            .tasks
            .iter()
            .position(|t| t.id == blocked_task_id)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown task {blocked_task_id}")))?;

        let mut resolver = SubTask::new(
            format!("Resolve blocker for {}", self.tasks[blocked_idx].title),
            blocker_description.clone(),
        );
        resolver.priority = 5;
        let resolver_id = resolver.id;

        self.tasks[blocked_idx].depends_on.push(resolver_id);
        self.tasks[blocked_idx].blocker = Some(blocker_description);
        self.tasks.insert(blocked_idx, resolver);

        Ok(resolver_id)
    }
}

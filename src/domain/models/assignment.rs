//! Task assignment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A binding of one sub-task to one agent, created by the scheduler.
///
/// Has no independent lifecycle: it is destroyed implicitly when the
/// owning task reaches a terminal status, not tracked as a separate entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: Uuid,
    pub agent_id: String,
    pub assigned_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: u8,
}

impl TaskAssignment {
    pub fn new(task_id: Uuid, agent_id: impl Into<String>, priority: u8) -> Self {
        Self {
            task_id,
            agent_id: agent_id.into(),
            assigned_at: Utc::now(),
            deadline: None,
            priority,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now > d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn overdue_when_past_deadline() {
        let now = Utc::now();
        let assignment = TaskAssignment::new(Uuid::new_v4(), "a1", 3).with_deadline(now - Duration::minutes(1));
        assert!(assignment.is_overdue(now));
    }

    #[test]
    fn not_overdue_without_deadline() {
        let assignment = TaskAssignment::new(Uuid::new_v4(), "a1", 3);
        assert!(!assignment.is_overdue(Utc::now()));
    }
}

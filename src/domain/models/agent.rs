//! Agent registry domain model.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::CoreError;

/// The kind of work an agent is registered to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coordinator,
    Developer,
    Reviewer,
    Tester,
    Documenter,
    Bot,
    Researcher,
}

impl AgentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Developer => "developer",
            Self::Reviewer => "reviewer",
            Self::Tester => "tester",
            Self::Documenter => "documenter",
            Self::Bot => "bot",
            Self::Researcher => "researcher",
        }
    }
}

impl FromStr for AgentRole {
    type Err = CoreError;

    /// Inverse of [`AgentRole::as_str`], used by the `agent register`
    /// CLI command and by the SQLite repository reading the `role` column.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coordinator" => Ok(Self::Coordinator),
            "developer" => Ok(Self::Developer),
            "reviewer" => Ok(Self::Reviewer),
            "tester" => Ok(Self::Tester),
            "documenter" => Ok(Self::Documenter),
            "bot" => Ok(Self::Bot),
            "researcher" => Ok(Self::Researcher),
            other => Err(CoreError::ValidationError(format!("unknown agent role {other:?}"))),
        }
    }
}

/// A registered worker's capabilities and current load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    pub agent_id: String,
    pub role: AgentRole,
    pub skills: HashSet<String>,
    pub max_concurrent_tasks: u32,
    pub current_task_count: u32,
    pub available: bool,
}

impl AgentCapability {
    pub fn new(agent_id: impl Into<String>, role: AgentRole) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            skills: HashSet::new(),
            max_concurrent_tasks: 1,
            current_task_count: 0,
            available: true,
        }
    }

    /// Whether this agent has free capacity right now.
    pub fn has_capacity(&self) -> bool {
        self.available && self.current_task_count < self.max_concurrent_tasks
    }

    /// `0.0` at full load, `1.0` when idle. Used by the scheduler's load bonus.
    pub fn load_headroom(&self) -> f64 {
        if self.max_concurrent_tasks == 0 {
            return 0.0;
        }
        let max = f64::from(self.max_concurrent_tasks);
        let current = f64::from(self.current_task_count.min(self.max_concurrent_tasks));
        (max - current) / max
    }

    /// Increment load, enforcing `current_task_count <= max_concurrent_tasks`.
    pub fn take_task(&mut self) -> bool {
        if !self.has_capacity() {
            return false;
        }
        self.current_task_count += 1;
        true
    }

    /// Decrement load on task terminal state. Saturating: never underflows.
    pub fn release_task(&mut self) {
        self.current_task_count = self.current_task_count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_as_str_round_trips_through_from_str() {
        for role in [
            AgentRole::Coordinator,
            AgentRole::Developer,
            AgentRole::Reviewer,
            AgentRole::Tester,
            AgentRole::Documenter,
            AgentRole::Bot,
            AgentRole::Researcher,
        ] {
            assert_eq!(role.as_str().parse::<AgentRole>().unwrap(), role);
        }
    }

    #[test]
    fn from_str_rejects_unknown_role() {
        assert!("wizard".parse::<AgentRole>().is_err());
    }

    #[test]
    fn take_task_respects_capacity() {
        let mut agent = AgentCapability::new("a1", AgentRole::Developer);
        agent.max_concurrent_tasks = 1;
        assert!(agent.take_task());
        assert!(!agent.has_capacity());
        assert!(!agent.take_task());
    }

    #[test]
    fn release_task_never_underflows() {
        let mut agent = AgentCapability::new("a1", AgentRole::Developer);
        agent.release_task();
        assert_eq!(agent.current_task_count, 0);
    }

    #[test]
    fn load_headroom_full_at_zero_load() {
        let mut agent = AgentCapability::new("a1", AgentRole::Developer);
        agent.max_concurrent_tasks = 4;
        assert!((agent.load_headroom() - 1.0).abs() < f64::EPSILON);
        agent.current_task_count = 2;
        assert!((agent.load_headroom() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unavailable_agent_has_no_capacity_even_when_idle() {
        let mut agent = AgentCapability::new("a1", AgentRole::Developer);
        agent.available = false;
        assert!(!agent.has_capacity());
    }
}

//! In-memory agent registry (C8).
//!
//! Holds no execution state beyond `current_task_count`, which the
//! Scheduler increments on assignment and decrements on a task reaching
//! a terminal status. Guarded externally by the scheduler's critical
//! section (see [`crate::application::scheduler::Scheduler`]); this type
//! itself is a plain, non-thread-safe map so it composes cleanly inside
//! a `tokio::sync::Mutex<SchedulerState>`.

use std::collections::HashMap;

use crate::domain::models::agent::{AgentCapability, AgentRole};

/// `agent_id -> AgentCapability`.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentCapability>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: AgentCapability) {
        self.agents.insert(capability.agent_id.clone(), capability);
    }

    pub fn deregister(&mut self, agent_id: &str) -> Option<AgentCapability> {
        self.agents.remove(agent_id)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentCapability> {
        self.agents.get(agent_id)
    }

    pub fn get_mut(&mut self, agent_id: &str) -> Option<&mut AgentCapability> {
        self.agents.get_mut(agent_id)
    }

    /// Agents matching an optional role and/or skill filter, with spare
    /// capacity and marked available.
    pub fn list_available(&self, role: Option<AgentRole>, skill: Option<&str>) -> Vec<&AgentCapability> {
        let mut agents: Vec<&AgentCapability> = self
            .agents
            .values()
            .filter(|a| a.has_capacity())
            .filter(|a| role.is_none_or(|r| a.role == r))
            .filter(|a| skill.is_none_or(|s| a.skills.contains(s)))
            .collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        agents
    }

    pub fn all(&self) -> impl Iterator<Item = &AgentCapability> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

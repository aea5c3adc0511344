//! Agent roster persistence port.
//!
//! An [`AgentCapability`] registered via the CLI needs to survive past
//! one process invocation (`agent register` today, `agent list` in the
//! next); the [`crate::application::scheduler::Scheduler`] that tracks
//! live load during one run stays purely in-memory, exactly like
//! `TaskDag`'s in-memory status machine — `current_task_count` here is
//! always `0` on load, since that's per-process load, not durable state.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::agent::AgentCapability;

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn save_agent(&self, agent: &AgentCapability) -> CoreResult<()>;
    async fn list_agents(&self) -> CoreResult<Vec<AgentCapability>>;
    async fn delete_agent(&self, agent_id: &str) -> CoreResult<()>;
}

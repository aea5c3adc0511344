//! Queryable [`AgentRepository`] backed by the `agents` table (see
//! `migrations/002_agents.sql`). Skills are stored as a comma-joined
//! list; there are rarely more than a handful per agent and a join
//! table would be pure overhead for this crate's scale.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::agent::{AgentCapability, AgentRole};
use crate::domain::ports::agent_repository::AgentRepository;

#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn save_agent(&self, agent: &AgentCapability) -> CoreResult<()> {
        let skills: Vec<&str> = agent.skills.iter().map(String::as_str).collect();
        sqlx::query(
            "INSERT INTO agents (agent_id, role, max_concurrent_tasks, available, skills, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(agent_id) DO UPDATE SET
                role = excluded.role,
                max_concurrent_tasks = excluded.max_concurrent_tasks,
                available = excluded.available,
                skills = excluded.skills",
        )
        .bind(&agent.agent_id)
        .bind(agent.role.as_str())
        .bind(agent.max_concurrent_tasks as i64)
        .bind(agent.available)
        .bind(skills.join(","))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_agents(&self) -> CoreResult<Vec<AgentCapability>> {
        let rows = sqlx::query("SELECT agent_id, role, max_concurrent_tasks, available, skills FROM agents ORDER BY agent_id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let agent_id: String = row.try_get("agent_id").map_err(|e| CoreError::Internal(e.to_string()))?;
                let role: String = row.try_get("role").map_err(|e| CoreError::Internal(e.to_string()))?;
                let max_concurrent_tasks: i64 =
                    row.try_get("max_concurrent_tasks").map_err(|e| CoreError::Internal(e.to_string()))?;
                let available: bool = row.try_get("available").map_err(|e| CoreError::Internal(e.to_string()))?;
                let skills: String = row.try_get("skills").map_err(|e| CoreError::Internal(e.to_string()))?;

                let role: AgentRole = role.parse().map_err(|_: CoreError| CoreError::Internal(format!("unknown agent role {role:?} in storage")))?;
                let mut capability = AgentCapability::new(agent_id, role);
                capability.max_concurrent_tasks = max_concurrent_tasks as u32;
                capability.available = available;
                capability.skills = skills.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect::<HashSet<_>>();
                Ok(capability)
            })
            .collect()
    }

    async fn delete_agent(&self, agent_id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM agents WHERE agent_id = ?1").bind(agent_id).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{connection::create_test_pool, migrations};

    async fn repo() -> SqliteAgentRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run(&pool).await.unwrap();
        SqliteAgentRepository::new(pool)
    }

    #[tokio::test]
    async fn save_then_list_roundtrips_role_and_skills() {
        let repo = repo().await;
        let mut agent = AgentCapability::new("a1", AgentRole::Developer);
        agent.max_concurrent_tasks = 3;
        agent.skills.insert("rust".to_string());
        repo.save_agent(&agent).await.unwrap();

        let agents = repo.list_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent_id, "a1");
        assert_eq!(agents[0].role, AgentRole::Developer);
        assert_eq!(agents[0].max_concurrent_tasks, 3);
        assert!(agents[0].skills.contains("rust"));
        assert_eq!(agents[0].current_task_count, 0);
    }

    #[tokio::test]
    async fn save_agent_twice_upserts() {
        let repo = repo().await;
        let mut agent = AgentCapability::new("a1", AgentRole::Tester);
        repo.save_agent(&agent).await.unwrap();
        agent.max_concurrent_tasks = 9;
        repo.save_agent(&agent).await.unwrap();

        let agents = repo.list_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].max_concurrent_tasks, 9);
    }

    #[tokio::test]
    async fn delete_agent_removes_the_row() {
        let repo = repo().await;
        let agent = AgentCapability::new("a1", AgentRole::Developer);
        repo.save_agent(&agent).await.unwrap();
        repo.delete_agent("a1").await.unwrap();
        assert!(repo.list_agents().await.unwrap().is_empty());
    }
}

//! Queryable [`PlanRepository`] backed by the `plans` table (see
//! `migrations/001_plans.sql`). The `body` column carries the full
//! `ExecutionPlan` as JSON; `issue_owner`/`issue_repo`/`issue_number`,
//! `status`, `plan_priority`, and `created_at` are denormalized out of
//! it purely so `plan list` can filter/sort in SQL without deserializing
//! every row first.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::plan::ExecutionPlan;
use crate::domain::ports::plan_repository::PlanRepository;

/// SQLite-backed [`PlanRepository`]. Cloneable: wraps a pooled
/// connection, not a single handle.
#[derive(Clone)]
pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn save_plan(&self, plan: &ExecutionPlan) -> CoreResult<()> {
        let body = serde_json::to_string(plan)?;
        sqlx::query(
            "INSERT INTO plans (plan_id, issue_owner, issue_repo, issue_number, status, plan_priority, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(plan_id) DO UPDATE SET
                status = excluded.status,
                plan_priority = excluded.plan_priority,
                body = excluded.body",
        )
        .bind(plan.plan_id.to_string())
        .bind(&plan.issue_owner)
        .bind(&plan.issue_repo)
        .bind(plan.issue_number as i64)
        .bind(plan.status.as_str())
        .bind(plan.plan_priority as i64)
        .bind(plan.created_at.to_rfc3339())
        .bind(&body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_plan(&self, plan_id: Uuid) -> CoreResult<Option<ExecutionPlan>> {
        let row = sqlx::query("SELECT body FROM plans WHERE plan_id = ?1")
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let body: String = row.try_get("body").map_err(|e| CoreError::Internal(e.to_string()))?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn list_plans(&self) -> CoreResult<Vec<ExecutionPlan>> {
        let rows = sqlx::query("SELECT body FROM plans ORDER BY created_at ASC").fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                let body: String = row.try_get("body").map_err(|e| CoreError::Internal(e.to_string()))?;
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }

    async fn delete_plan(&self, plan_id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM plans WHERE plan_id = ?1").bind(plan_id.to_string()).execute(&self.pool).await?;
        Ok(())
    }
}

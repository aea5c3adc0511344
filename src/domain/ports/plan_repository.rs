//! Plan persistence port.
//!
//! Two adapters implement this: [`crate::adapters::fs::plan_store::JsonPlanStore`]
//! (spec.md §6's literal one-file-per-plan requirement) and
//! [`crate::adapters::sqlite::plan_repository::SqlitePlanRepository`]
//! (queryable history, used by the CLI's `plan list`).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::CoreResult;
use crate::domain::models::plan::ExecutionPlan;

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn save_plan(&self, plan: &ExecutionPlan) -> CoreResult<()>;
    async fn load_plan(&self, plan_id: Uuid) -> CoreResult<Option<ExecutionPlan>>;
    async fn list_plans(&self) -> CoreResult<Vec<ExecutionPlan>>;
    async fn delete_plan(&self, plan_id: Uuid) -> CoreResult<()>;
}

//! One-file-per-plan JSON persistence, the literal `PlanRepository`
//! shape spelled out alongside the SQLite adapter: every plan is a
//! standalone, greppable file under a root directory, named by its
//! plan id.

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::plan::ExecutionPlan;
use crate::domain::ports::plan_repository::PlanRepository;

/// JSON-file-backed [`PlanRepository`]. Cheap, inspectable, and the
/// default for single-operator deployments; [`crate::adapters::sqlite::plan_repository::SqlitePlanRepository`]
/// is for installations that want `plan list --since` queries.
pub struct JsonPlanStore {
    root: std::path::PathBuf,
}

impl JsonPlanStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, plan_id: Uuid) -> std::path::PathBuf {
        self.root.join(format!("{plan_id}.json"))
    }

    async fn ensure_root(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CoreError::Internal(format!("creating plan store root {}: {e}", self.root.display())))
    }
}

#[async_trait]
impl PlanRepository for JsonPlanStore {
    async fn save_plan(&self, plan: &ExecutionPlan) -> CoreResult<()> {
        self.ensure_root().await?;
        let body = serde_json::to_vec_pretty(plan)?;
        let path = self.path_for(plan.plan_id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &body)
            .await
            .map_err(|e| CoreError::Internal(format!("writing {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| CoreError::Internal(format!("renaming into {}: {e}", path.display())))?;
        Ok(())
    }

    async fn load_plan(&self, plan_id: Uuid) -> CoreResult<Option<ExecutionPlan>> {
        let path = self.path_for(plan_id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Internal(format!("reading {}: {e}", path.display()))),
        }
    }

    async fn list_plans(&self) -> CoreResult<Vec<ExecutionPlan>> {
        self.ensure_root().await?;
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| CoreError::Internal(format!("reading plan store root: {e}")))?;
        let mut plans = Vec::new();
        while let Some(entry) =
            entries.next_entry().await.map_err(|e| CoreError::Internal(format!("iterating plan store: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await.map_err(|e| CoreError::Internal(format!("reading {}: {e}", path.display())))?;
            plans.push(serde_json::from_slice(&bytes)?);
        }
        plans.sort_by_key(|p: &ExecutionPlan| p.created_at);
        Ok(plans)
    }

    async fn delete_plan(&self, plan_id: Uuid) -> CoreResult<()> {
        let path = self.path_for(plan_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Internal(format!("removing {}: {e}", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlanStore::new(dir.path());
        let plan = ExecutionPlan::new("o", "r", 1);
        store.save_plan(&plan).await.unwrap();

        let loaded = store.load_plan(plan.plan_id).await.unwrap().unwrap();
        assert_eq!(loaded.plan_id, plan.plan_id);
        assert_eq!(loaded.issue_number, 1);
    }

    #[tokio::test]
    async fn load_missing_plan_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlanStore::new(dir.path());
        assert!(store.load_plan(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_plans_returns_every_saved_plan() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlanStore::new(dir.path());
        store.save_plan(&ExecutionPlan::new("o", "r", 1)).await.unwrap();
        store.save_plan(&ExecutionPlan::new("o", "r", 2)).await.unwrap();
        assert_eq!(store.list_plans().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_plan_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlanStore::new(dir.path());
        let plan = ExecutionPlan::new("o", "r", 1);
        store.save_plan(&plan).await.unwrap();
        store.delete_plan(plan.plan_id).await.unwrap();
        assert!(store.load_plan(plan.plan_id).await.unwrap().is_none());
    }
}

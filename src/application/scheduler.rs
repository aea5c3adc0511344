//! Scheduling and assignment engine (C9).
//!
//! Owns the only mutable view of "who is free and what is ready to run":
//! the [`AgentRegistry`] and every in-flight [`ExecutionPlan`], both
//! behind one `tokio::sync::Mutex`. `next_assignment` is the critical
//! section every other component (the Planner handing off a freshly
//! decomposed plan, a poller looking for work) goes through rather than
//! touching the registry or a plan directly — the same "one lock owns
//! the whole decision" shape as the teacher's `TaskCoordinator`, just
//! without the `mpsc` status channel, since nothing downstream of this
//! process subscribes to task-status events yet.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::agent::{AgentCapability, AgentRole};
use crate::domain::models::assignment::TaskAssignment;
use crate::domain::models::plan::{ExecutionPlan, PlanStatus};
use crate::domain::models::task::TaskStatus;
use crate::domain::registry::AgentRegistry;

/// Per-plan progress snapshot for the CLI's `plan show`.
#[derive(Debug, Clone)]
pub struct PlanProgress {
    pub plan_id: Uuid,
    pub status: PlanStatus,
    pub completion_percentage: u8,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
    pub failed: usize,
    pub blockers: Vec<(Uuid, String)>,
}

struct SchedulerState {
    registry: AgentRegistry,
    plans: HashMap<Uuid, ExecutionPlan>,
}

/// Bonus applied when an agent's role matches the verb in a task's
/// title; `0` for an unmatched verb (default developer-equivalent
/// scoring per SPEC_FULL.md §9's resolved open question).
const ROLE_MATCH_BONUS: f64 = 10.0;
/// Maximum bonus from an agent's spare capacity (`load_headroom() * this`).
const MAX_LOAD_BONUS: f64 = 5.0;

fn role_bonus(title: &str, role: AgentRole) -> f64 {
    let title = title.to_lowercase();
    let matches = match role {
        AgentRole::Developer => {
            title.contains("implement") || title.contains("add") || title.contains("fix") || title.contains("create")
        }
        AgentRole::Tester => title.contains("test"),
        AgentRole::Reviewer => title.contains("review"),
        AgentRole::Documenter => title.contains("doc"),
        AgentRole::Researcher => title.contains("research") || title.contains("investigate"),
        AgentRole::Coordinator | AgentRole::Bot => false,
    };
    if matches {
        ROLE_MATCH_BONUS
    } else {
        0.0
    }
}

fn score_agent(title: &str, agent: &AgentCapability) -> f64 {
    role_bonus(title, agent.role) + agent.load_headroom() * MAX_LOAD_BONUS
}

/// Tasks a plan is allowed to schedule work from: still decomposing or
/// actively executing. Paused plans are skipped entirely; completed and
/// failed ones have nothing left to assign.
fn is_active(status: PlanStatus) -> bool {
    matches!(status, PlanStatus::Planning | PlanStatus::Executing)
}

/// The C9 scheduler: one process-wide instance, threaded in rather than
/// reached as a singleton.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self { state: Mutex::new(SchedulerState { registry: AgentRegistry::new(), plans: HashMap::new() }) }
    }

    pub async fn register_agent(&self, capability: AgentCapability) {
        self.state.lock().await.registry.register(capability);
    }

    pub async fn deregister_agent(&self, agent_id: &str) -> Option<AgentCapability> {
        self.state.lock().await.registry.deregister(agent_id)
    }

    pub async fn agent_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Every registered agent's current snapshot, for callers (the CLI's
    /// `scheduler tick`) that need to persist load changes back to the
    /// [`crate::domain::ports::agent_repository::AgentRepository`] after
    /// a round of assignment.
    pub async fn list_agents(&self) -> Vec<AgentCapability> {
        self.state.lock().await.registry.all().cloned().collect()
    }

    pub async fn add_plan(&self, plan: ExecutionPlan) {
        let mut state = self.state.lock().await;
        state.plans.insert(plan.plan_id, plan);
    }

    pub async fn plan(&self, plan_id: Uuid) -> Option<ExecutionPlan> {
        self.state.lock().await.plans.get(&plan_id).cloned()
    }

    pub async fn list_plans(&self) -> Vec<ExecutionPlan> {
        self.state.lock().await.plans.values().cloned().collect()
    }

    /// Find and commit the single next assignment, atomically, across
    /// every active plan: plans ordered by `(-plan_priority, created_at)`,
    /// tasks inside a plan by topological order with priority tie-break,
    /// agents scored by role match plus load headroom (spec.md §4.9).
    /// Returns `None` when there is nothing ready to assign right now —
    /// not an error, since "no work available" is a normal poll outcome.
    pub async fn next_assignment(&self) -> CoreResult<Option<TaskAssignment>> {
        let mut state = self.state.lock().await;

        let mut plan_ids: Vec<Uuid> = state
            .plans
            .values()
            .filter(|p| is_active(p.status))
            .map(|p| p.plan_id)
            .collect();
        plan_ids.sort_by(|a, b| {
            let pa = &state.plans[a];
            let pb = &state.plans[b];
            pb.plan_priority.cmp(&pa.plan_priority).then(pa.created_at.cmp(&pb.created_at))
        });

        for plan_id in plan_ids {
            let ready_task = {
                let plan = &state.plans[&plan_id];
                let dag = plan.dependency_graph()?;
                let order = dag.topological_order(|id| plan.find_task(id).map(|t| t.priority).unwrap_or(0))?;
                order.into_iter().find_map(|id| {
                    let task = plan.find_task(id)?;
                    (task.status == TaskStatus::Pending && task.assigned_to.is_none()).then_some(id)
                })
            };

            let Some(task_id) = ready_task else { continue };
            let title = state.plans[&plan_id].find_task(task_id).unwrap().title.clone();
            let priority = state.plans[&plan_id].find_task(task_id).unwrap().priority;

            let mut best: Option<(String, f64)> = None;
            for agent in state.registry.all().filter(|a| a.has_capacity()) {
                let score = score_agent(&title, agent);
                if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                    best = Some((agent.agent_id.clone(), score));
                }
            }

            let Some((agent_id, _)) = best else { continue };

            let agent = state.registry.get_mut(&agent_id).expect("agent just selected must exist");
            if !agent.take_task() {
                continue;
            }

            let plan = state.plans.get_mut(&plan_id).expect("plan just selected must exist");
            let task = plan.find_task_mut(task_id).expect("task just selected must exist");
            task.assigned_to = Some(agent_id.clone());
            task.transition(TaskStatus::InProgress)?;
            plan.refresh_status();

            return Ok(Some(TaskAssignment::new(task_id, agent_id, priority)));
        }

        Ok(None)
    }

    /// Mark a task's terminal status, release its agent's load, and
    /// refresh the owning plan's status.
    pub async fn complete_task(&self, plan_id: Uuid, task_id: Uuid, outcome: TaskStatus) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let plan = state
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown plan {plan_id}")))?;
        let task = plan
            .find_task_mut(task_id)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown task {task_id}")))?;
        let agent_id = task.assigned_to.clone();
        task.transition(outcome)?;
        plan.refresh_status();

        if let Some(agent_id) = agent_id {
            if let Some(agent) = state.registry.get_mut(&agent_id) {
                agent.release_task();
            }
        }
        Ok(())
    }

    /// Adapt a blocked task by inserting a resolver task ahead of it and
    /// returning it to `pending`, per the `blocked -> pending` transition
    /// [`TaskStatus::can_transition_to`] documents.
    pub async fn adapt_blocked_task(
        &self,
        plan_id: Uuid,
        blocked_task_id: Uuid,
        blocker_description: impl Into<String>,
    ) -> CoreResult<Uuid> {
        let mut state = self.state.lock().await;
        let plan = state
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown plan {plan_id}")))?;
        let resolver_id = plan.insert_blocker_resolution(blocked_task_id, blocker_description)?;
        let blocked = plan.find_task_mut(blocked_task_id).expect("just inserted a dependency on this task");
        blocked.transition(TaskStatus::Pending)?;
        Ok(resolver_id)
    }

    pub async fn progress(&self, plan_id: Uuid) -> Option<PlanProgress> {
        let state = self.state.lock().await;
        let plan = state.plans.get(&plan_id)?;

        let mut pending = 0;
        let mut in_progress = 0;
        let mut completed = 0;
        let mut blocked = 0;
        let mut failed = 0;
        let mut blockers = Vec::new();
        for task in &plan.tasks {
            match task.status {
                TaskStatus::Pending => pending += 1,
                TaskStatus::InProgress => in_progress += 1,
                TaskStatus::Completed => completed += 1,
                TaskStatus::Blocked => {
                    blocked += 1;
                    blockers.push((task.id, task.blocker.clone().unwrap_or_default()));
                }
                TaskStatus::Failed => failed += 1,
            }
        }

        Some(PlanProgress {
            plan_id,
            status: plan.status,
            completion_percentage: plan.completion_percentage(),
            pending,
            in_progress,
            completed,
            blocked,
            failed,
            blockers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::SubTask;

    fn dev(id: &str, max: u32) -> AgentCapability {
        let mut a = AgentCapability::new(id, AgentRole::Developer);
        a.max_concurrent_tasks = max;
        a
    }

    fn plan_with_tasks(tasks: Vec<SubTask>) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new("o", "r", 1);
        plan.tasks = tasks;
        plan
    }

    #[tokio::test]
    async fn assigns_the_first_ready_task_to_the_least_loaded_agent() {
        let scheduler = Scheduler::new();
        scheduler.register_agent(dev("busy", 2)).await;
        scheduler.register_agent(dev("idle", 2)).await;
        {
            let mut state = scheduler.state.lock().await;
            state.registry.get_mut("busy").unwrap().current_task_count = 1;
        }

        let plan = plan_with_tasks(vec![SubTask::new("Implement the thing", "d")]);
        scheduler.add_plan(plan.clone()).await;

        let assignment = scheduler.next_assignment().await.unwrap().unwrap();
        assert_eq!(assignment.agent_id, "idle");
    }

    #[tokio::test]
    async fn respects_topological_order() {
        let scheduler = Scheduler::new();
        scheduler.register_agent(dev("a1", 5)).await;

        let first = SubTask::new("Implement base", "d");
        let mut second = SubTask::new("Implement follow-up", "d");
        second.depends_on.push(first.id);
        let plan = plan_with_tasks(vec![second, first.clone()]);
        scheduler.add_plan(plan).await;

        let assignment = scheduler.next_assignment().await.unwrap().unwrap();
        assert_eq!(assignment.task_id, first.id);
    }

    #[tokio::test]
    async fn returns_none_when_no_agent_has_capacity() {
        let scheduler = Scheduler::new();
        let mut full = dev("full", 1);
        full.current_task_count = 1;
        scheduler.register_agent(full).await;

        let plan = plan_with_tasks(vec![SubTask::new("Implement", "d")]);
        scheduler.add_plan(plan).await;

        assert!(scheduler.next_assignment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_task_releases_agent_load() {
        let scheduler = Scheduler::new();
        scheduler.register_agent(dev("a1", 1)).await;
        let plan = plan_with_tasks(vec![SubTask::new("Implement", "d")]);
        let plan_id = plan.plan_id;
        scheduler.add_plan(plan).await;

        let assignment = scheduler.next_assignment().await.unwrap().unwrap();
        scheduler.complete_task(plan_id, assignment.task_id, TaskStatus::Completed).await.unwrap();

        let progress = scheduler.progress(plan_id).await.unwrap();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.status, PlanStatus::Completed);
    }

    #[tokio::test]
    async fn adapt_blocked_task_reopens_it_as_pending() {
        let scheduler = Scheduler::new();
        let task = SubTask::new("Implement", "d");
        let task_id = task.id;
        let plan = plan_with_tasks(vec![task]);
        let plan_id = plan.plan_id;
        scheduler.add_plan(plan).await;

        {
            let mut state = scheduler.state.lock().await;
            let plan = state.plans.get_mut(&plan_id).unwrap();
            let task = plan.find_task_mut(task_id).unwrap();
            task.transition(TaskStatus::InProgress).unwrap();
            task.transition(TaskStatus::Blocked).unwrap();
        }

        scheduler.adapt_blocked_task(plan_id, task_id, "waiting on a design review").await.unwrap();
        let plan = scheduler.plan(plan_id).await.unwrap();
        assert_eq!(plan.find_task(task_id).unwrap().status, TaskStatus::Pending);
        assert_eq!(plan.tasks.len(), 2);
    }

    #[tokio::test]
    async fn list_agents_reflects_load_after_assignment() {
        let scheduler = Scheduler::new();
        scheduler.register_agent(dev("a1", 2)).await;
        let plan = plan_with_tasks(vec![SubTask::new("Implement", "d")]);
        scheduler.add_plan(plan).await;

        scheduler.next_assignment().await.unwrap();

        let agents = scheduler.list_agents().await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].current_task_count, 1);
    }
}

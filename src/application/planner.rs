//! Issue decomposition (C7).
//!
//! Turns one [`Issue`] into an [`ExecutionPlan`]: a baseline three-task
//! skeleton (implement, test, document) that an optional LLM pass may
//! refine into a richer breakdown. The baseline alone is a valid plan —
//! the LLM step only ever adds or reshapes tasks, it never replaces the
//! fallback, mirroring the downgrade-on-failure contract every LLM-backed
//! component in this crate follows (see [`crate::domain::ports::llm::LlmPort`]).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::errors::CoreResult;
use crate::domain::models::config::PlannerConfig;
use crate::domain::models::issue::Issue;
use crate::domain::models::plan::ExecutionPlan;
use crate::domain::models::task::SubTask;
use crate::domain::ports::llm::{CompletionRequest, LlmPort};

/// Label -> plan priority, highest first match wins. Unmatched issues
/// default to `1` (spec.md §4.7's `required_roles`/priority mapping).
const PRIORITY_LABELS: &[(&str, u8)] = &[
    ("critical", 5),
    ("security", 5),
    ("p0", 5),
    ("high-priority", 5),
    ("bug", 4),
    ("p1", 4),
    ("urgent", 4),
    ("enhancement", 3),
    ("feature", 3),
    ("documentation", 2),
    ("chore", 2),
];

#[derive(Debug, Deserialize)]
struct LlmSubTask {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Option<u8>,
    #[serde(default)]
    effort_minutes: Option<u32>,
    #[serde(default)]
    depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlmPlanResponse {
    tasks: Vec<LlmSubTask>,
}

fn plan_priority(issue: &Issue) -> u8 {
    for (label, priority) in PRIORITY_LABELS {
        if issue.has_label(label) {
            return *priority;
        }
    }
    1
}

/// Roles a baseline/LLM task breakdown implies, inferred from title
/// verbs. `coordinator` is always included: an orchestrated plan exists
/// because C6 routed it here, so the coordinator role stays represented
/// in `required_roles` for the duration of the plan.
fn infer_roles(tasks: &[SubTask]) -> std::collections::HashSet<String> {
    let mut roles: std::collections::HashSet<String> = ["coordinator".to_string()].into_iter().collect();
    for task in tasks {
        let title = task.title.to_lowercase();
        if title.contains("implement") || title.contains("fix") || title.contains("add") {
            roles.insert("developer".to_string());
        }
        if title.contains("test") {
            roles.insert("tester".to_string());
        }
        if title.contains("doc") {
            roles.insert("documenter".to_string());
        }
        if title.contains("review") {
            roles.insert("reviewer".to_string());
        }
    }
    roles
}

fn baseline_tasks(issue: &Issue, default_effort: u32) -> Vec<SubTask> {
    let mut implement = SubTask::new(format!("Implement changes for {}", issue.title), issue.body.clone());
    implement.estimated_effort_minutes = default_effort;

    let mut test = SubTask::new(format!("Write tests for {}", issue.title), "Cover the new behavior with tests.");
    test.estimated_effort_minutes = default_effort / 2;
    test.depends_on.push(implement.id);

    let mut document =
        SubTask::new(format!("Document changes for {}", issue.title), "Update docs/changelog as needed.");
    document.estimated_effort_minutes = default_effort / 4;
    document.depends_on.push(implement.id);

    vec![implement, test, document]
}

/// Decomposes issues into execution plans, optionally refined by an LLM.
pub struct Planner {
    config: PlannerConfig,
    llm: Option<Arc<dyn LlmPort>>,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config, llm: None }
    }

    pub fn with_llm(config: PlannerConfig, llm: Arc<dyn LlmPort>) -> Self {
        Self { config, llm: Some(llm) }
    }

    /// Decompose `issue` into an [`ExecutionPlan`]. Never fails on LLM
    /// trouble: a parse error or LLM error just means the baseline
    /// three-task skeleton ships as-is.
    pub async fn plan(&self, issue: &Issue) -> CoreResult<ExecutionPlan> {
        let mut tasks = baseline_tasks(issue, self.config.default_task_effort_min);

        if let Some(llm) = &self.llm {
            if let Some(proposed) = self.propose_tasks(issue, llm).await {
                tasks = proposed;
            }
        }

        for task in &mut tasks {
            task.sanitize();
        }
        tasks.truncate(self.config.max_sub_tasks);
        let retained: std::collections::HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
        for task in &mut tasks {
            task.depends_on.retain(|dep| retained.contains(dep));
        }

        let mut plan = ExecutionPlan::new(issue.key.owner.clone(), issue.key.repo.clone(), issue.key.number);
        plan.plan_priority = plan_priority(issue);
        plan.labels = issue.labels.iter().cloned().collect();
        plan.required_roles = infer_roles(&tasks);
        plan.tasks = tasks;
        // Validate the DAG now rather than let a bad LLM breakdown surface
        // as a scheduler error later.
        plan.dependency_graph()?;
        Ok(plan)
    }

    async fn propose_tasks(&self, issue: &Issue, llm: &Arc<dyn LlmPort>) -> Option<Vec<SubTask>> {
        let prompt = format!(
            "Break the following issue into an ordered list of engineering sub-tasks. \
             Respond with JSON only: {{\"tasks\": [{{\"title\": str, \"description\": str, \
             \"priority\": 1-5, \"effort_minutes\": int, \"depends_on\": [title, ...]}}]}}.\n\n\
             Title: {}\nBody:\n{}",
            issue.title, issue.body
        );
        let response = llm.complete(CompletionRequest::new(prompt, "planner")).await.ok()?;
        let parsed: LlmPlanResponse = serde_json::from_str(response.trim()).ok()?;
        if parsed.tasks.is_empty() {
            return None;
        }

        let mut by_title: HashMap<String, Uuid> = HashMap::new();
        let mut tasks: Vec<SubTask> = parsed
            .tasks
            .iter()
            .map(|t| {
                let mut task = SubTask::new(t.title.clone(), t.description.clone());
                if let Some(priority) = t.priority {
                    task.priority = priority;
                }
                if let Some(effort) = t.effort_minutes {
                    task.estimated_effort_minutes = effort;
                }
                by_title.insert(t.title.clone(), task.id);
                task
            })
            .collect();

        for (task, llm_task) in tasks.iter_mut().zip(parsed.tasks.iter()) {
            for dep_title in &llm_task.depends_on {
                if let Some(&dep_id) = by_title.get(dep_title) {
                    let _ = task.add_dependency(dep_id);
                }
            }
        }

        Some(tasks)
    }
}

//! `plan show` / `plan list` CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::state::AppState;
use crate::domain::models::plan::ExecutionPlan;
use crate::domain::models::task::TaskStatus;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanCommands,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Show one plan's tasks and progress
    Show {
        /// Plan id (UUID)
        id: String,
    },
    /// List every known plan
    List,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub plan_id: String,
    pub issue: String,
    pub status: String,
    pub completion_percentage: u8,
    pub task_count: usize,
    pub plan_priority: u8,
}

impl From<&ExecutionPlan> for PlanSummary {
    fn from(plan: &ExecutionPlan) -> Self {
        Self {
            plan_id: plan.plan_id.to_string(),
            issue: format!("{}/{}#{}", plan.issue_owner, plan.issue_repo, plan.issue_number),
            status: plan.status.as_str().to_string(),
            completion_percentage: plan.completion_percentage(),
            task_count: plan.tasks.len(),
            plan_priority: plan.plan_priority,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanListOutput {
    pub plans: Vec<PlanSummary>,
}

impl CommandOutput for PlanListOutput {
    fn to_human(&self) -> String {
        if self.plans.is_empty() {
            return "No plans found.".to_string();
        }
        let mut lines = vec![format!(
            "{:<38} {:<28} {:<10} {:>5} {:>5} {:>3}",
            "PLAN ID", "ISSUE", "STATUS", "DONE%", "TASKS", "PRI"
        )];
        lines.push("-".repeat(95));
        for plan in &self.plans {
            lines.push(format!(
                "{:<38} {:<28} {:<10} {:>5} {:>5} {:>3}",
                plan.plan_id,
                truncate(&plan.issue, 26),
                plan.status,
                plan.completion_percentage,
                plan.task_count,
                plan.plan_priority
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub id: String,
    pub title: String,
    pub status: String,
    pub assigned_to: Option<String>,
    pub depends_on: Vec<String>,
    pub blocker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanDetailOutput {
    pub summary: PlanSummary,
    pub tasks: Vec<TaskDetail>,
    pub required_roles: Vec<String>,
    pub labels: Vec<String>,
}

impl CommandOutput for PlanDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Plan {} ({})", self.summary.plan_id, self.summary.issue),
            format!(
                "status={} completion={}% priority={} required_roles={}",
                self.summary.status,
                self.summary.completion_percentage,
                self.summary.plan_priority,
                self.required_roles.join(",")
            ),
            String::new(),
            format!("{:<38} {:<30} {:<12} {:<12}", "TASK ID", "TITLE", "STATUS", "ASSIGNED"),
        ];
        lines.push("-".repeat(95));
        for task in &self.tasks {
            lines.push(format!(
                "{:<38} {:<30} {:<12} {:<12}",
                task.id,
                truncate(&task.title, 28),
                task.status,
                task.assigned_to.as_deref().unwrap_or("-")
            ));
            if let Some(blocker) = &task.blocker {
                lines.push(format!("    blocked: {blocker}"));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn status_label(task: &crate::domain::models::task::SubTask) -> String {
    match task.status {
        TaskStatus::Pending if task.blocker.is_some() => "blocked*".to_string(),
        other => other.as_str().to_string(),
    }
}

pub async fn execute(args: PlanArgs, state: &AppState, json_mode: bool) -> Result<()> {
    match args.command {
        PlanCommands::Show { id } => {
            let plan_id = Uuid::parse_str(&id).context("plan id must be a UUID")?;
            let plan = state
                .plan_repository
                .load_plan(plan_id)
                .await
                .context("failed to load plan")?
                .ok_or_else(|| anyhow::anyhow!("no plan with id {plan_id}"))?;

            let detail = PlanDetailOutput {
                summary: PlanSummary::from(&plan),
                tasks: plan
                    .tasks
                    .iter()
                    .map(|t| TaskDetail {
                        id: t.id.to_string(),
                        title: t.title.clone(),
                        status: status_label(t),
                        assigned_to: t.assigned_to.clone(),
                        depends_on: t.depends_on.iter().map(ToString::to_string).collect(),
                        blocker: t.blocker.clone(),
                    })
                    .collect(),
                required_roles: plan.required_roles.iter().cloned().collect(),
                labels: plan.labels.clone(),
            };
            output(&detail, json_mode);
        }
        PlanCommands::List => {
            let plans = state.plan_repository.list_plans().await.context("failed to list plans")?;
            let result = PlanListOutput { plans: plans.iter().map(PlanSummary::from).collect() };
            output(&result, json_mode);
        }
    }
    Ok(())
}

//! `scheduler tick` CLI command.
//!
//! Runs exactly one round of [`crate::application::scheduler::Scheduler::next_assignment`]
//! against the plans/agents loaded at startup, then persists whatever
//! changed. The scheduler itself is in-memory and process-local; this
//! command is the bridge that makes one `tick` durable across CLI
//! invocations, the same role [`crate::adapters::sqlite::SqlitePlanRepository`]
//! plays for `plan show`/`plan list`.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::state::AppState;

#[derive(Args, Debug)]
pub struct SchedulerArgs {
    #[command(subcommand)]
    pub command: SchedulerCommands,
}

#[derive(Subcommand, Debug)]
pub enum SchedulerCommands {
    /// Assign the single next-ready task to the best-scoring available agent
    Tick,
}

#[derive(Debug, Serialize)]
pub struct TickOutput {
    pub assigned: bool,
    pub task_id: Option<String>,
    pub agent_id: Option<String>,
    pub priority: Option<u8>,
}

impl CommandOutput for TickOutput {
    fn to_human(&self) -> String {
        match (&self.task_id, &self.agent_id) {
            (Some(task_id), Some(agent_id)) => format!("Assigned task {task_id} to agent {agent_id}."),
            _ => "No ready task to assign.".to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SchedulerArgs, state: &AppState, json_mode: bool) -> Result<()> {
    match args.command {
        SchedulerCommands::Tick => {
            let assignment = state.scheduler.next_assignment().await.context("scheduler tick failed")?;

            for plan in state.scheduler.list_plans().await {
                state.plan_repository.save_plan(&plan).await.context("failed to persist plan after tick")?;
            }
            for agent in state.scheduler.list_agents().await {
                state.agent_repository.save_agent(&agent).await.context("failed to persist agent after tick")?;
            }

            let result = match assignment {
                Some(assignment) => TickOutput {
                    assigned: true,
                    task_id: Some(assignment.task_id.to_string()),
                    agent_id: Some(assignment.agent_id),
                    priority: Some(assignment.priority),
                },
                None => TickOutput { assigned: false, task_id: None, agent_id: None, priority: None },
            };
            output(&result, json_mode);
        }
    }
    Ok(())
}

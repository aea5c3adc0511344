//! `pr review <repo> <number>` CLI command.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::application::PrWorkflowOutcome;
use crate::cli::output::{output, CommandOutput};
use crate::cli::state::AppState;

#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommands,
}

#[derive(Subcommand, Debug)]
pub enum PrCommands {
    /// Run review, labeling, reviewer assignment, and the merge decision for one PR
    Review {
        /// `owner/name` of the repository
        repo: String,
        /// Pull request number
        number: u64,
        /// Local checkout to run the test suite against, if the reviewed PR changed tests
        #[arg(long)]
        workspace: Option<std::path::PathBuf>,
    },
}

#[derive(Debug, Serialize)]
pub struct PrReviewOutput {
    pub repo: String,
    pub number: u64,
    pub outcome: String,
}

impl CommandOutput for PrReviewOutput {
    fn to_human(&self) -> String {
        format!("{}#{}: {}", self.repo, self.number, self.outcome)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn describe(outcome: &PrWorkflowOutcome) -> String {
    match outcome {
        PrWorkflowOutcome::Skipped { reason } => format!("skipped ({reason})"),
        PrWorkflowOutcome::ClosedForConflicts => "closed for unresolvable merge conflicts".to_string(),
        PrWorkflowOutcome::ParkedForConflicts => "parked pending manual conflict resolution".to_string(),
        PrWorkflowOutcome::Merged { recommendation } => format!("merged ({recommendation:?})"),
        PrWorkflowOutcome::Drafted { critical_count } => format!("converted to draft ({critical_count} critical issue(s))"),
        PrWorkflowOutcome::Parked { recommendation } => format!("parked for manual review ({recommendation:?})"),
    }
}

pub async fn execute(args: PrArgs, state: &AppState, json_mode: bool) -> Result<()> {
    match args.command {
        PrCommands::Review { repo, number, workspace } => {
            let pr = state.forge.get_pr(&repo, number).await.context("failed to fetch pull request")?;
            let outcome = state.pr_workflow.run(&pr, workspace.as_deref()).await.context("pr workflow failed")?;

            let result = PrReviewOutput { repo, number, outcome: describe(&outcome) };
            output(&result, json_mode);
        }
    }
    Ok(())
}

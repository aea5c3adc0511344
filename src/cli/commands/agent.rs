//! `agent list` / `agent register` CLI commands.

use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::state::AppState;
use crate::domain::models::agent::{AgentCapability, AgentRole};

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List every registered agent and its current load
    List,
    /// Register (or update) an agent's capabilities
    Register {
        /// Stable agent id
        id: String,
        /// Role: coordinator, developer, reviewer, tester, documenter, bot, researcher
        #[arg(long, default_value = "developer")]
        role: String,
        /// Maximum number of concurrent tasks this agent can hold
        #[arg(long, default_value_t = 1)]
        max_concurrent_tasks: u32,
        /// Comma-separated skill tags
        #[arg(long, default_value = "")]
        skills: String,
    },
}

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub role: String,
    pub skills: Vec<String>,
    pub max_concurrent_tasks: u32,
    pub current_task_count: u32,
    pub available: bool,
}

impl From<&AgentCapability> for AgentSummary {
    fn from(agent: &AgentCapability) -> Self {
        let mut skills: Vec<String> = agent.skills.iter().cloned().collect();
        skills.sort();
        Self {
            agent_id: agent.agent_id.clone(),
            role: agent.role.as_str().to_string(),
            skills,
            max_concurrent_tasks: agent.max_concurrent_tasks,
            current_task_count: agent.current_task_count,
            available: agent.available,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentSummary>,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents registered.".to_string();
        }
        let mut lines = vec![format!("{:<20} {:<12} {:<8} {:<10} {:<30}", "AGENT", "ROLE", "LOAD", "AVAILABLE", "SKILLS")];
        lines.push("-".repeat(85));
        for agent in &self.agents {
            lines.push(format!(
                "{:<20} {:<12} {:<8} {:<10} {:<30}",
                agent.agent_id,
                agent.role,
                format!("{}/{}", agent.current_task_count, agent.max_concurrent_tasks),
                agent.available,
                agent.skills.join(",")
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct AgentRegisteredOutput {
    pub agent: AgentSummary,
}

impl CommandOutput for AgentRegisteredOutput {
    fn to_human(&self) -> String {
        format!("Registered agent {} ({}).", self.agent.agent_id, self.agent.role)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AgentArgs, state: &AppState, json_mode: bool) -> Result<()> {
    match args.command {
        AgentCommands::List => {
            let agents = state.agent_repository.list_agents().await.context("failed to list agents")?;
            let result = AgentListOutput { agents: agents.iter().map(AgentSummary::from).collect() };
            output(&result, json_mode);
        }
        AgentCommands::Register { id, role, max_concurrent_tasks, skills } => {
            let role: AgentRole = role.parse().context("unrecognized agent role")?;
            let mut agent = AgentCapability::new(id, role);
            agent.max_concurrent_tasks = max_concurrent_tasks;
            agent.skills = skills.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect::<HashSet<_>>();

            state.agent_repository.save_agent(&agent).await.context("failed to save agent")?;
            state.scheduler.register_agent(agent.clone()).await;

            output(&AgentRegisteredOutput { agent: AgentSummary::from(&agent) }, json_mode);
        }
    }
    Ok(())
}

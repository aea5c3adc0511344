//! CLI interface module.
//!
//! Command definitions, output formatting, and the process-wide
//! [`AppState`] every command is dispatched against.

pub mod commands;
pub mod output;
pub mod state;

use clap::{Parser, Subcommand};

pub use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "swarmctl", about = "Coordination fabric for a multi-agent software engineering platform", version)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a YAML config file, overriding the `.swarmctl/` default search.
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect execution plans produced by the planner
    Plan(commands::plan::PlanArgs),
    /// Inspect and register agents in the scheduler's roster
    Agent(commands::agent::AgentArgs),
    /// Drive the scheduler
    Scheduler(commands::scheduler::SchedulerArgs),
    /// Inspect the rate limiter's current state
    RateLimit(commands::rate_limit::RateLimitArgs),
    /// Run the review/merge workflow against a pull request
    Pr(commands::pr::PrArgs),
}

//! swarmctl CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use swarmctl::cli::commands::{agent, plan, pr, rate_limit, scheduler};
use swarmctl::cli::{AppState, Cli, Commands};
use swarmctl::infrastructure::config::ConfigLoader;
use swarmctl::infrastructure::logging::logger;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path).context("failed to load configuration")?,
        None => ConfigLoader::load().context("failed to load configuration")?,
    };

    logger::init(&config.logging).context("failed to initialize logging")?;

    let database_url = std::env::var("SWARMCTL_DATABASE_URL").unwrap_or_else(|_| "sqlite:.swarmctl/swarmctl.db".to_string());
    let state = AppState::bootstrap(config, &database_url).await.context("failed to initialize swarmctl")?;

    match cli.command {
        Commands::Plan(args) => plan::execute(args, &state, cli.json).await?,
        Commands::Agent(args) => agent::execute(args, &state, cli.json).await?,
        Commands::Scheduler(args) => scheduler::execute(args, &state, cli.json).await?,
        Commands::RateLimit(args) => rate_limit::execute(args, &state, cli.json).await?,
        Commands::Pr(args) => pr::execute(args, &state, cli.json).await?,
    }

    Ok(())
}

//! `rate-limit stats` CLI command.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::state::AppState;

#[derive(Args, Debug)]
pub struct RateLimitArgs {
    #[command(subcommand)]
    pub command: RateLimitCommands,
}

#[derive(Subcommand, Debug)]
pub enum RateLimitCommands {
    /// Show current call counts against every configured cap
    Stats,
}

#[derive(Debug, Serialize)]
pub struct OperationTypeStatsOutput {
    pub operation_type: String,
    pub last_minute: u32,
    pub per_minute_cap: u32,
    pub last_hour: u32,
    pub per_hour_cap: u32,
    pub last_day: u32,
    pub per_day_cap: u32,
}

#[derive(Debug, Serialize)]
pub struct RateLimitStatsOutput {
    pub per_type: Vec<OperationTypeStatsOutput>,
    pub burst_count: u32,
    pub max_burst: u32,
    pub platform_quota_remaining: Option<u32>,
}

impl CommandOutput for RateLimitStatsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("{:<15} {:>10} {:>10} {:>10}", "OPERATION", "1MIN", "1HOUR", "1DAY")];
        lines.push("-".repeat(50));
        for s in &self.per_type {
            lines.push(format!(
                "{:<15} {:>10} {:>10} {:>10}",
                s.operation_type,
                format!("{}/{}", s.last_minute, s.per_minute_cap),
                format!("{}/{}", s.last_hour, s.per_hour_cap),
                format!("{}/{}", s.last_day, s.per_day_cap),
            ));
        }
        lines.push(String::new());
        lines.push(format!("burst: {}/{}", self.burst_count, self.max_burst));
        lines.push(format!(
            "platform quota remaining: {}",
            self.platform_quota_remaining.map_or("unknown".to_string(), |r| r.to_string())
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RateLimitArgs, state: &AppState, json_mode: bool) -> Result<()> {
    match args.command {
        RateLimitCommands::Stats => {
            let stats = state.rate_limiter.stats();
            let result = RateLimitStatsOutput {
                per_type: stats
                    .per_type
                    .into_iter()
                    .map(|s| OperationTypeStatsOutput {
                        operation_type: s.operation_type.as_str().to_string(),
                        last_minute: s.last_minute,
                        per_minute_cap: s.caps.per_minute,
                        last_hour: s.last_hour,
                        per_hour_cap: s.caps.per_hour,
                        last_day: s.last_day,
                        per_day_cap: s.caps.per_day,
                    })
                    .collect(),
                burst_count: stats.burst_count,
                max_burst: stats.max_burst,
                platform_quota_remaining: stats.platform_quota.remaining,
            };
            output(&result, json_mode);
        }
    }
    Ok(())
}

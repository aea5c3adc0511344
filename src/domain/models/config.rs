//! Top-level application configuration shape.
//!
//! Mirrors every category enumerated in SPEC_FULL.md §6: rate limits,
//! planner, monitor, sandbox, review/merge, and complexity thresholds.
//! Loaded by [`crate::infrastructure::config::loader::ConfigLoader`] via
//! `figment` (YAML file + environment overrides); this module holds only
//! the plain-data shape so the domain layer stays free of I/O.

use serde::{Deserialize, Serialize};

use super::rate_limit::RateLimitConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub sandbox: SandboxSettings,
    #[serde(default)]
    pub review_merge: ReviewMergeConfig,
    #[serde(default)]
    pub complexity_thresholds: ComplexityThresholds,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitConfig::default(),
            planner: PlannerConfig::default(),
            monitor: MonitorConfig::default(),
            sandbox: SandboxSettings::default(),
            review_merge: ReviewMergeConfig::default(),
            complexity_thresholds: ComplexityThresholds::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    pub max_sub_tasks: usize,
    pub default_task_effort_min: u32,
    pub max_concurrent_tasks: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { max_sub_tasks: 20, default_task_effort_min: 60, max_concurrent_tasks: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    pub check_interval_s: u64,
    pub blocker_threshold_s: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { check_interval_s: 30, blocker_threshold_s: 1800 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SandboxSettings {
    pub allowed_base_dirs: Vec<String>,
    pub blocked_commands: Vec<String>,
    pub blocked_patterns: Vec<String>,
    pub allowed_commands: Option<Vec<String>>,
    pub default_timeout_s: u64,
    pub max_timeout_s: u64,
    pub max_output_bytes: usize,
    pub max_concurrent_commands: usize,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            allowed_base_dirs: vec![std::env::temp_dir().to_string_lossy().to_string()],
            blocked_commands: vec!["rm -rf /".to_string(), ":(){ :|:& };:".to_string()],
            blocked_patterns: vec![
                r"\bsudo\b".to_string(),
                r"curl[^|]*\|\s*(sh|bash)".to_string(),
                r"wget[^|]*\|\s*(sh|bash)".to_string(),
                r"\beval\s*\(".to_string(),
                r"\bexec\s*\(".to_string(),
            ],
            allowed_commands: None,
            default_timeout_s: 120,
            max_timeout_s: 600,
            max_output_bytes: 64 * 1024,
            max_concurrent_commands: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethodSetting {
    Merge,
    Squash,
    Rebase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReviewMergeConfig {
    pub use_llm: bool,
    pub llm_model: String,
    pub llm_endpoint: Option<String>,
    pub auto_merge_if_approved: bool,
    pub merge_with_suggestions: bool,
    pub merge_method: MergeMethodSetting,
    pub auto_assign_reviewers: bool,
    pub auto_label: bool,
    pub reviewers: Vec<String>,
    /// Identity the self-review guard compares a PR's author against;
    /// a PR opened by this identity is never reviewed by itself.
    pub reviewer_identity: String,
}

impl Default for ReviewMergeConfig {
    fn default() -> Self {
        Self {
            use_llm: false,
            llm_model: "gpt-4o-mini".to_string(),
            llm_endpoint: None,
            auto_merge_if_approved: true,
            merge_with_suggestions: false,
            merge_method: MergeMethodSetting::Squash,
            auto_assign_reviewers: true,
            auto_label: true,
            reviewers: Vec::new(),
            reviewer_identity: "swarmctl-bot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComplexityThresholds {
    pub simple_threshold: u32,
    pub complex_threshold: u32,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self { simple_threshold: 10, complex_threshold: 25 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub audit_log_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string(), audit_log_path: ".swarmctl/audit.log".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_thresholds() {
        let config = AppConfig::default();
        assert_eq!(config.complexity_thresholds.simple_threshold, 10);
        assert_eq!(config.complexity_thresholds.complex_threshold, 25);
        assert_eq!(config.planner.max_sub_tasks, 20);
    }
}

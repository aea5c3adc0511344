//! Hierarchical configuration loader.
//!
//! Precedence (lowest to highest), following the teacher's
//! `infrastructure::config::loader::ConfigLoader`:
//! 1. Programmatic defaults ([`AppConfig::default`]).
//! 2. `.swarmctl/config.yaml` (project config).
//! 3. `.swarmctl/local.yaml` (optional local overrides).
//! 4. Environment variables prefixed `SWARMCTL_`, double-underscore
//!    separated for nested fields (highest priority).

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::AppConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("planner.max_sub_tasks must be at least 1")]
    InvalidMaxSubTasks,
    #[error("sandbox.max_timeout_s must be >= sandbox.default_timeout_s")]
    InvalidSandboxTimeouts,
    #[error("complexity_thresholds.simple_threshold must be < complex_threshold")]
    InvalidComplexityThresholds,
    #[error("logging.level {0:?} is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging from the process's
    /// current working directory.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(".swarmctl/config.yaml"))
            .merge(Yaml::file(".swarmctl/local.yaml"))
            .merge(Env::prefixed("SWARMCTL_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.planner.max_sub_tasks == 0 {
            return Err(ConfigError::InvalidMaxSubTasks);
        }
        if config.sandbox.max_timeout_s < config.sandbox.default_timeout_s {
            return Err(ConfigError::InvalidSandboxTimeouts);
        }
        if config.complexity_thresholds.simple_threshold >= config.complexity_thresholds.complex_threshold {
            return Err(ConfigError::InvalidComplexityThresholds);
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AppConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn zero_max_sub_tasks_rejected() {
        let mut config = AppConfig::default();
        config.planner.max_sub_tasks = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxSubTasks)));
    }

    #[test]
    fn inverted_complexity_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.complexity_thresholds.simple_threshold = 30;
        config.complexity_thresholds.complex_threshold = 10;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidComplexityThresholds)));
    }
}

//! Operator-visible audit trail.
//!
//! Per spec.md §7: coordinator-decision comments, review comments, and
//! label changes are the only channels by which the system tells humans
//! what happened. Every such mutation is recorded here, distinct from
//! debug-level `tracing` output, following the teacher's
//! `infrastructure::logging::audit::AuditLogger` append-only JSON-lines
//! pattern.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::secret_scrubbing::scrub;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    CoordinatorDecision,
    ReviewComment,
    LabelChange,
    Merge,
    Escalation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Denied,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub operation: String,
    pub target: String,
    pub outcome: AuditOutcome,
    pub metadata: Option<Value>,
}

#[derive(Clone)]
pub struct AuditLogger {
    log_file: Arc<Mutex<std::fs::File>>,
}

impl AuditLogger {
    pub async fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref();
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await.context("failed to create audit log directory")?;
        }
        let file = OpenOptions::new().create(true).append(true).open(log_path).context("failed to open audit log file")?;
        Ok(Self { log_file: Arc::new(Mutex::new(file)) })
    }

    pub fn log(
        &self,
        event_type: AuditEventType,
        operation: &str,
        target: &str,
        outcome: AuditOutcome,
        metadata: Option<Value>,
    ) -> Result<()> {
        let event = AuditEvent {
            timestamp: Utc::now(),
            event_type,
            operation: scrub(operation),
            target: target.to_string(),
            outcome,
            metadata,
        };
        let json = serde_json::to_string(&event).context("failed to serialize audit event")?;
        {
            let mut file = self.log_file.lock().map_err(|e| anyhow::anyhow!("audit log mutex poisoned: {e}"))?;
            writeln!(file, "{json}").context("failed to write audit event")?;
            file.flush().context("failed to flush audit log")?;
        }
        info!(event_type = ?event.event_type, target = %event.target, outcome = ?event.outcome, "audit event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn logs_event_as_json_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let logger = AuditLogger::new(&path).await.unwrap();
        logger
            .log(AuditEventType::CoordinatorDecision, "route issue", "o/r#1", AuditOutcome::Success, None)
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let event: AuditEvent = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(event.target, "o/r#1");
        assert_eq!(event.outcome, AuditOutcome::Success);
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/audit.log");
        let _logger = AuditLogger::new(&path).await.unwrap();
        assert!(path.exists());
    }
}

//! Rate limiter domain model: operation taxonomy, history records, and
//! the tunable caps the limiter evaluates against.
//!
//! This module holds only data; the stateful evaluation algorithm lives
//! in [`crate::infrastructure::rate_limiter::RateLimiter`], which owns a
//! `RateLimitConfig` and a bounded history of `OperationRecord`s per type.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of mutating (or read) forge call being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    IssueComment,
    PrComment,
    IssueCreate,
    PrCreate,
    IssueUpdate,
    PrUpdate,
    LabelUpdate,
    Assignment,
    ApiRead,
    ApiWrite,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IssueComment => "issue_comment",
            Self::PrComment => "pr_comment",
            Self::IssueCreate => "issue_create",
            Self::PrCreate => "pr_create",
            Self::IssueUpdate => "issue_update",
            Self::PrUpdate => "pr_update",
            Self::LabelUpdate => "label_update",
            Self::Assignment => "assignment",
            Self::ApiRead => "api_read",
            Self::ApiWrite => "api_write",
        }
    }
}

/// One past invocation, kept for windowed-count and duplicate-detection
/// purposes. `content_fingerprint` is present only for comment-like ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation_type: OperationType,
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub content_fingerprint: Option<String>,
    pub success: bool,
}

/// Per-operation-type caps: counts per minute/hour/day and a cooldown
/// between consecutive calls of that type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OperationCaps {
    pub per_minute: u32,
    pub per_hour: u32,
    pub per_day: u32,
    pub cooldown_secs: u64,
}

/// Tunable caps for the whole limiter. Defaults mirror the values the
/// original rate limiter shipped with; callers may override any field
/// from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub caps: HashMap<OperationType, OperationCaps>,
    /// Window within which identical content fingerprints are deduplicated.
    pub duplicate_window_secs: u64,
    /// Max occurrences of one fingerprint allowed within `duplicate_window_secs`.
    pub max_duplicates: u32,
    /// Window used for the total-call burst cap, across all operation types.
    pub burst_window_secs: u64,
    pub max_burst: u32,
    /// Deny everything once the forge-reported remaining quota drops below this.
    pub platform_headroom_floor: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut caps = HashMap::new();
        caps.insert(
            OperationType::IssueComment,
            OperationCaps { per_minute: 3, per_hour: 30, per_day: 200, cooldown_secs: 20 },
        );
        caps.insert(
            OperationType::PrComment,
            OperationCaps { per_minute: 3, per_hour: 30, per_day: 200, cooldown_secs: 20 },
        );
        caps.insert(
            OperationType::IssueCreate,
            OperationCaps { per_minute: 10, per_hour: 10, per_day: 50, cooldown_secs: 60 },
        );
        caps.insert(
            OperationType::PrCreate,
            OperationCaps { per_minute: 5, per_hour: 5, per_day: 20, cooldown_secs: 120 },
        );
        for op in [
            OperationType::IssueUpdate,
            OperationType::PrUpdate,
            OperationType::LabelUpdate,
            OperationType::Assignment,
            OperationType::ApiRead,
            OperationType::ApiWrite,
        ] {
            caps.insert(op, OperationCaps { per_minute: 20, per_hour: 200, per_day: 2000, cooldown_secs: 0 });
        }

        Self {
            caps,
            duplicate_window_secs: 3600,
            max_duplicates: 2,
            burst_window_secs: 60,
            max_burst: 10,
            platform_headroom_floor: 100,
        }
    }
}

impl RateLimitConfig {
    pub fn caps_for(&self, op: OperationType) -> OperationCaps {
        self.caps.get(&op).copied().unwrap_or(OperationCaps {
            per_minute: 20,
            per_hour: 200,
            per_day: 2000,
            cooldown_secs: 0,
        })
    }
}

/// The forge's self-reported global quota, fed in from response headers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlatformQuota {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_caps_match_documented_defaults() {
        let cfg = RateLimitConfig::default();
        let comment = cfg.caps_for(OperationType::IssueComment);
        assert_eq!(comment.per_minute, 3);
        assert_eq!(comment.per_hour, 30);
        assert_eq!(comment.per_day, 200);
        assert_eq!(comment.cooldown_secs, 20);

        let issue_create = cfg.caps_for(OperationType::IssueCreate);
        assert_eq!(issue_create.per_hour, 10);
        assert_eq!(issue_create.cooldown_secs, 60);

        let pr_create = cfg.caps_for(OperationType::PrCreate);
        assert_eq!(pr_create.per_hour, 5);
        assert_eq!(pr_create.cooldown_secs, 120);

        assert_eq!(cfg.duplicate_window_secs, 3600);
        assert_eq!(cfg.max_duplicates, 2);
        assert_eq!(cfg.burst_window_secs, 60);
        assert_eq!(cfg.max_burst, 10);
        assert_eq!(cfg.platform_headroom_floor, 100);
    }

    #[test]
    fn unconfigured_op_falls_back_to_generic_caps() {
        let cfg = RateLimitConfig { caps: HashMap::new(), ..RateLimitConfig::default() };
        let caps = cfg.caps_for(OperationType::ApiRead);
        assert_eq!(caps.per_minute, 20);
    }
}

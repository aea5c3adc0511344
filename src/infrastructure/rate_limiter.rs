//! Stateful rate-limiting/anti-spam engine (C1).
//!
//! Gates every mutating forge call. `check` is a pure decision over the
//! current history — it never mutates state; `record` appends the
//! outcome after the caller actually performs the HTTP call. This split
//! lets [`crate::adapters::forge::github::GitHubForgeClient`] (and the
//! mock) implement the documented sequence: check -> call -> observe
//! platform headers -> record.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sha2::{Digest, Sha256};

use crate::domain::models::rate_limit::{OperationRecord, OperationType, PlatformQuota, RateLimitConfig};

/// First-class deny result, not an error. Carries the reason a caller
/// can surface verbatim in a `CoreError::RateLimited`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Stable short fingerprint of comment-like content: first 16 hex chars
/// of SHA-256, used for duplicate-suppression and for the idempotence
/// laws in SPEC_FULL.md §8 (two coordinator-decision comments, one
/// review comment per PR workflow run).
pub fn fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

struct LimiterState {
    history: VecDeque<OperationRecord>,
    last_op_at: std::collections::HashMap<OperationType, DateTime<Utc>>,
    platform_quota: PlatformQuota,
}

impl LimiterState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            last_op_at: std::collections::HashMap::new(),
            platform_quota: PlatformQuota::default(),
        }
    }
}

/// The rate limiter itself: one process-wide instance, threaded into
/// every component that talks to the forge rather than reached as a
/// singleton (SPEC_FULL.md §9's "global singletons" redesign note).
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, state: Mutex::new(LimiterState::new()) }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Feed response headers from the forge. Best-effort: a caller that
    /// can't parse the headers simply omits the call rather than erroring.
    pub fn observe_platform_limits(&self, remaining: u32, reset_at: DateTime<Utc>) {
        let mut state = self.state.lock().expect("rate limiter mutex poisoned");
        state.platform_quota.remaining = Some(remaining);
        state.platform_quota.reset_at = Some(reset_at);
    }

    /// Pure decision over the current history; does not mutate it.
    pub fn check(&self, op_type: OperationType, _target: &str, content: Option<&str>) -> Decision {
        let state = self.state.lock().expect("rate limiter mutex poisoned");
        let now = Utc::now();

        // 1. Platform headroom.
        if let Some(remaining) = state.platform_quota.remaining {
            if remaining < self.config.platform_headroom_floor {
                return Decision::Deny("platform headroom low".to_string());
            }
        }

        // 2. Cooldown.
        let caps = self.config.caps_for(op_type);
        if caps.cooldown_secs > 0 {
            if let Some(last) = state.last_op_at.get(&op_type) {
                let elapsed = now.signed_duration_since(*last);
                let cooldown = ChronoDuration::seconds(caps.cooldown_secs as i64);
                if elapsed < cooldown {
                    let remaining_cooldown = (cooldown - elapsed).num_seconds().max(0);
                    return Decision::Deny(format!("cooldown active, {remaining_cooldown}s remaining"));
                }
            }
        }

        // 3. Per-minute/hour/day caps.
        let count_since = |window: ChronoDuration| {
            state
                .history
                .iter()
                .filter(|r| r.operation_type == op_type && r.success && now.signed_duration_since(r.timestamp) < window)
                .count() as u32
        };
        if count_since(ChronoDuration::minutes(1)) >= caps.per_minute {
            return Decision::Deny(format!("per-minute cap of {} reached", caps.per_minute));
        }
        if count_since(ChronoDuration::hours(1)) >= caps.per_hour {
            return Decision::Deny(format!("per-hour cap of {} reached", caps.per_hour));
        }
        if count_since(ChronoDuration::days(1)) >= caps.per_day {
            return Decision::Deny(format!("per-day cap of {} reached", caps.per_day));
        }

        // 4. Duplicate content fingerprint.
        if let Some(content) = content {
            let fp = fingerprint(content);
            let window = ChronoDuration::seconds(self.config.duplicate_window_secs as i64);
            let duplicates = state
                .history
                .iter()
                .filter(|r| {
                    r.success
                        && r.content_fingerprint.as_deref() == Some(fp.as_str())
                        && now.signed_duration_since(r.timestamp) < window
                })
                .count() as u32;
            if duplicates >= self.config.max_duplicates {
                return Decision::Deny("duplicate".to_string());
            }
        }

        // 5. Burst cap across all operation types.
        let burst_window = ChronoDuration::seconds(self.config.burst_window_secs as i64);
        let burst_count = state
            .history
            .iter()
            .filter(|r| now.signed_duration_since(r.timestamp) < burst_window)
            .count() as u32;
        if burst_count >= self.config.max_burst {
            return Decision::Deny("burst limit reached".to_string());
        }

        Decision::Allow
    }

    /// Append a record of the outcome. Always called regardless of
    /// `success` so failed attempts still count toward cooldowns — a
    /// caller that fails to write a comment shouldn't be able to retry
    /// instantly and spam the forge.
    pub fn record(&self, op_type: OperationType, target: &str, content: Option<&str>, success: bool) {
        let now = Utc::now();
        let fp = content.map(fingerprint);
        let mut state = self.state.lock().expect("rate limiter mutex poisoned");
        state.last_op_at.insert(op_type, now);
        state.history.push_back(OperationRecord {
            operation_type: op_type,
            timestamp: now,
            target: target.to_string(),
            content_fingerprint: fp,
            success,
        });
        self.clean_history(&mut state, now);
    }

    /// Drop records older than the longest configured window so memory
    /// stays bounded.
    fn clean_history(&self, state: &mut LimiterState, now: DateTime<Utc>) {
        let longest = ChronoDuration::seconds(self.config.duplicate_window_secs as i64)
            .max(ChronoDuration::days(1))
            .max(ChronoDuration::seconds(self.config.burst_window_secs as i64));
        while let Some(front) = state.history.front() {
            if now.signed_duration_since(front.timestamp) > longest {
                state.history.pop_front();
            } else {
                break;
            }
        }
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    /// Snapshot used by the CLI's `rate-limit stats` command: per-type
    /// call counts over the windows the caps are actually evaluated
    /// against, plus the last observed platform quota.
    pub fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock().expect("rate limiter mutex poisoned");
        let now = Utc::now();
        let count_since = |op: OperationType, window: ChronoDuration| {
            state
                .history
                .iter()
                .filter(|r| r.operation_type == op && r.success && now.signed_duration_since(r.timestamp) < window)
                .count() as u32
        };

        let per_type = [
            OperationType::IssueComment,
            OperationType::PrComment,
            OperationType::IssueCreate,
            OperationType::PrCreate,
            OperationType::IssueUpdate,
            OperationType::PrUpdate,
            OperationType::LabelUpdate,
            OperationType::Assignment,
            OperationType::ApiRead,
            OperationType::ApiWrite,
        ]
        .into_iter()
        .map(|op| OperationTypeStats {
            operation_type: op,
            last_minute: count_since(op, ChronoDuration::minutes(1)),
            last_hour: count_since(op, ChronoDuration::hours(1)),
            last_day: count_since(op, ChronoDuration::days(1)),
            caps: self.config.caps_for(op),
        })
        .collect();

        RateLimiterStats {
            per_type,
            burst_count: state
                .history
                .iter()
                .filter(|r| now.signed_duration_since(r.timestamp) < ChronoDuration::seconds(self.config.burst_window_secs as i64))
                .count() as u32,
            max_burst: self.config.max_burst,
            platform_quota: state.platform_quota,
        }
    }
}

/// Per-operation-type slice of [`RateLimiterStats`].
#[derive(Debug, Clone)]
pub struct OperationTypeStats {
    pub operation_type: OperationType,
    pub last_minute: u32,
    pub last_hour: u32,
    pub last_day: u32,
    pub caps: crate::domain::models::rate_limit::OperationCaps,
}

/// Full rate limiter snapshot, returned by [`RateLimiter::stats`].
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub per_type: Vec<OperationTypeStats>,
    pub burst_count: u32,
    pub max_burst: u32,
    pub platform_quota: PlatformQuota,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_first_comment_then_denies_cooldown() {
        let limiter = RateLimiter::with_defaults();
        assert!(limiter.check(OperationType::IssueComment, "o/r#1", Some("hello")).is_allowed());
        limiter.record(OperationType::IssueComment, "o/r#1", Some("hello"), true);

        let decision = limiter.check(OperationType::IssueComment, "o/r#1", Some("hello again"));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn duplicate_content_denied_after_max_duplicates() {
        let mut config = RateLimitConfig::default();
        config.caps.get_mut(&OperationType::IssueComment).unwrap().cooldown_secs = 0;
        let limiter = RateLimiter::new(config);

        for _ in 0..2 {
            assert!(limiter.check(OperationType::IssueComment, "o/r#1", Some("same body")).is_allowed());
            limiter.record(OperationType::IssueComment, "o/r#1", Some("same body"), true);
        }
        let decision = limiter.check(OperationType::IssueComment, "o/r#1", Some("same body"));
        assert_eq!(decision, Decision::Deny("duplicate".to_string()));
    }

    #[test]
    fn platform_headroom_floor_denies_everything() {
        let limiter = RateLimiter::with_defaults();
        limiter.observe_platform_limits(50, Utc::now());
        let decision = limiter.check(OperationType::ApiRead, "o/r", None);
        assert_eq!(decision, Decision::Deny("platform headroom low".to_string()));
    }

    #[test]
    fn burst_cap_denies_after_max_burst_total_records() {
        let mut config = RateLimitConfig::default();
        for caps in config.caps.values_mut() {
            caps.cooldown_secs = 0;
            caps.per_minute = 1000;
        }
        let limiter = RateLimiter::new(config);
        for i in 0..10 {
            limiter.record(OperationType::ApiRead, &format!("t{i}"), None, true);
        }
        let decision = limiter.check(OperationType::ApiRead, "t10", None);
        assert_eq!(decision, Decision::Deny("burst limit reached".to_string()));
    }

    #[test]
    fn fingerprint_is_stable_and_16_hex_chars() {
        let a = fingerprint("hello world");
        let b = fingerprint("hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn history_is_bounded_by_longest_window() {
        let limiter = RateLimiter::with_defaults();
        for i in 0..5 {
            limiter.record(OperationType::ApiRead, &format!("t{i}"), None, true);
        }
        assert_eq!(limiter.history_len(), 5);
    }

    #[test]
    fn stats_reflects_recorded_calls() {
        let limiter = RateLimiter::with_defaults();
        limiter.record(OperationType::ApiRead, "t0", None, true);
        limiter.record(OperationType::IssueComment, "o/r#1", Some("hi"), true);

        let stats = limiter.stats();
        let api_read = stats.per_type.iter().find(|s| s.operation_type == OperationType::ApiRead).unwrap();
        assert_eq!(api_read.last_minute, 1);
        let comment = stats.per_type.iter().find(|s| s.operation_type == OperationType::IssueComment).unwrap();
        assert_eq!(comment.last_minute, 1);
        assert_eq!(stats.burst_count, 2);
        assert_eq!(stats.max_burst, 10);
    }
}

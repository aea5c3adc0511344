//! PR review and merge-decision domain models.

use serde::{Deserialize, Serialize};

/// Severity of one review finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A single finding raised against a changed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub severity: Severity,
    pub file: String,
    pub message: String,
}

/// Outcome of running the test suite for a PR, when tests changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    pub summary: String,
}

/// The aggregate result of reviewing one pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrReviewResult {
    pub approved: bool,
    pub issues: Vec<ReviewIssue>,
    pub test_outcome: Option<TestOutcome>,
}

impl PrReviewResult {
    pub fn critical_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Critical).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Warning).count()
    }

    /// `approved = no critical issues ∧ tests pass when run`.
    pub fn finalize(mut self) -> Self {
        let tests_ok = self.test_outcome.as_ref().is_none_or(|t| t.passed);
        self.approved = self.critical_count() == 0 && tests_ok;
        self
    }
}

/// What the merge decider recommends for a reviewed PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeRecommendation {
    AutoMerge,
    MergeWithConsideration,
    ManualReview,
    DoNotMerge,
}

/// The merge decider's verdict plus the counts that justify it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeDecision {
    pub recommendation: MergeRecommendation,
    pub reason: String,
    pub critical_count: usize,
    pub warning_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_rejects_on_critical_issue() {
        let result = PrReviewResult {
            approved: true,
            issues: vec![ReviewIssue { severity: Severity::Critical, file: "a.rs".into(), message: "bad".into() }],
            test_outcome: None,
        }
        .finalize();
        assert!(!result.approved);
        assert_eq!(result.critical_count(), 1);
    }

    #[test]
    fn finalize_rejects_on_failing_tests() {
        let result = PrReviewResult {
            approved: true,
            issues: vec![],
            test_outcome: Some(TestOutcome { passed: false, summary: "1 failed".into() }),
        }
        .finalize();
        assert!(!result.approved);
    }

    #[test]
    fn finalize_approves_clean_pr() {
        let result = PrReviewResult {
            approved: false,
            issues: vec![ReviewIssue { severity: Severity::Info, file: "a.rs".into(), message: "nit".into() }],
            test_outcome: Some(TestOutcome { passed: true, summary: "ok".into() }),
        }
        .finalize();
        assert!(result.approved);
    }
}

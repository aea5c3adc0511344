//! Pure-function merge recommendation (C12).

use crate::domain::models::review::{MergeDecision, MergeRecommendation, PrReviewResult};

/// Decide what to do with a reviewed PR. A total function of the review
/// result alone; no forge or LLM calls.
pub fn decide(result: &PrReviewResult) -> MergeDecision {
    let critical_count = result.critical_count();
    let warning_count = result.warning_count();

    let (recommendation, reason) = if !result.approved {
        (MergeRecommendation::DoNotMerge, "review did not approve this PR".to_string())
    } else if critical_count > 0 {
        (MergeRecommendation::DoNotMerge, format!("{critical_count} critical issue(s) outstanding"))
    } else if result.issues.is_empty() {
        (MergeRecommendation::AutoMerge, "no issues raised during review".to_string())
    } else if warning_count <= 3 {
        (MergeRecommendation::MergeWithConsideration, format!("{warning_count} minor warning(s) to consider"))
    } else {
        (MergeRecommendation::ManualReview, format!("{warning_count} warnings exceed the auto-merge threshold"))
    };

    MergeDecision { recommendation, reason, critical_count, warning_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::review::{ReviewIssue, Severity, TestOutcome};

    fn approved_result(issues: Vec<ReviewIssue>) -> PrReviewResult {
        PrReviewResult { approved: true, issues, test_outcome: Some(TestOutcome { passed: true, summary: "ok".into() }) }
    }

    #[test]
    fn unapproved_review_is_do_not_merge() {
        let mut result = approved_result(vec![]);
        result.approved = false;
        assert_eq!(decide(&result).recommendation, MergeRecommendation::DoNotMerge);
    }

    #[test]
    fn critical_issue_forces_do_not_merge_even_if_approved() {
        let result = approved_result(vec![ReviewIssue {
            severity: Severity::Critical,
            file: "a.rs".into(),
            message: "unsafe".into(),
        }]);
        assert_eq!(decide(&result).recommendation, MergeRecommendation::DoNotMerge);
    }

    #[test]
    fn no_issues_is_auto_merge() {
        let result = approved_result(vec![]);
        assert_eq!(decide(&result).recommendation, MergeRecommendation::AutoMerge);
    }

    #[test]
    fn few_warnings_merge_with_consideration() {
        let issues = (0..3)
            .map(|i| ReviewIssue { severity: Severity::Warning, file: format!("f{i}.rs"), message: "nit".into() })
            .collect();
        let result = approved_result(issues);
        assert_eq!(decide(&result).recommendation, MergeRecommendation::MergeWithConsideration);
    }

    #[test]
    fn many_warnings_require_manual_review() {
        let issues = (0..4)
            .map(|i| ReviewIssue { severity: Severity::Warning, file: format!("f{i}.rs"), message: "nit".into() })
            .collect();
        let result = approved_result(issues);
        assert_eq!(decide(&result).recommendation, MergeRecommendation::ManualReview);
    }
}

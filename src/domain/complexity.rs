//! Pure-function complexity scoring (C5).
//!
//! A total function of `(title, body, labels)`; no I/O, no LLM call here.
//! Optional LLM refinement is layered on top by
//! [`crate::application::coordinator_gateway::CoordinatorGateway`], which
//! falls back to this result whenever the LLM port errors.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::models::complexity::{ComplexityAnalysis, ComplexityLevel, ComplexitySignals};
use crate::domain::models::config::ComplexityThresholds;
use crate::domain::models::issue::Issue;

const REFACTOR_KEYWORDS: &[&str] =
    &["refactor", "redesign", "rewrite", "restructure", "migrate", "upgrade", "modernize"];
const ARCHITECTURE_KEYWORDS: &[&str] =
    &["architecture", "system design", "infrastructure", "framework", "platform", "integration"];
const MULTI_COMPONENT_KEYWORDS: &[&str] =
    &["multiple", "several", "across", "throughout", "coordinate", "orchestrate", "synchronize"];
const COMPLEX_LABELS: &[&str] =
    &["refactor", "architecture", "multi-agent", "infrastructure", "breaking-change", "epic"];

fn file_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b\w+\.(py|js|ts|jsx|tsx|java|go|cpp|c|h|rb|php|cs|swift|kt|rs)\b").unwrap()
    })
}

fn dependency_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(depends on|blocked by|requires|needs) #\d+").unwrap())
}

fn gather_signals(title: &str, body: &str, labels: &[String]) -> ComplexitySignals {
    let full_text = format!("{title}\n{body}").to_lowercase();

    let checkbox_count = body.matches("- [ ]").count() + body.matches("- [x]").count();
    let file_mention_count = file_mention_re().find_iter(body).count();
    let code_block_count = body.matches("```").count();
    let dependency_mention_count = dependency_mention_re().find_iter(body).count();

    let refactor_keyword_hits = usize::from(REFACTOR_KEYWORDS.iter().any(|kw| full_text.contains(kw)));
    let architecture_keyword_hits = usize::from(ARCHITECTURE_KEYWORDS.iter().any(|kw| full_text.contains(kw)));
    let multi_component_keyword_hits =
        usize::from(MULTI_COMPONENT_KEYWORDS.iter().any(|kw| full_text.contains(kw)));
    let has_complexity_label = labels
        .iter()
        .any(|label| COMPLEX_LABELS.contains(&label.to_lowercase().as_str()));

    ComplexitySignals {
        description_length: body.len(),
        checkbox_count,
        file_mention_count,
        code_block_count,
        dependency_mention_count,
        refactor_keyword_hits,
        architecture_keyword_hits,
        multi_component_keyword_hits,
        has_complexity_label,
    }
}

fn score_signals(signals: &ComplexitySignals) -> u32 {
    let mut score = 0u32;

    score += if signals.description_length > 2000 {
        5
    } else if signals.description_length > 1000 {
        3
    } else if signals.description_length > 500 {
        1
    } else {
        0
    };

    score += if signals.checkbox_count >= 10 {
        10
    } else if signals.checkbox_count >= 5 {
        6
    } else if signals.checkbox_count >= 3 {
        3
    } else {
        0
    };

    score += if signals.file_mention_count >= 8 {
        8
    } else if signals.file_mention_count >= 4 {
        5
    } else if signals.file_mention_count >= 2 {
        2
    } else {
        0
    };

    score += if signals.code_block_count >= 6 {
        3
    } else if signals.code_block_count >= 3 {
        2
    } else {
        0
    };

    score += (signals.dependency_mention_count as u32 * 2).min(5);

    if signals.refactor_keyword_hits > 0 {
        score += 8;
    }
    if signals.architecture_keyword_hits > 0 {
        score += 10;
    }
    if signals.multi_component_keyword_hits > 0 {
        score += 6;
    }
    if signals.has_complexity_label {
        score += 10;
    }

    score
}

/// Score `(title, body, labels)` and bucket the result against the
/// default thresholds (10/25, spec.md §4.5). Pure and deterministic:
/// the same inputs always produce the same analysis.
pub fn analyze(title: &str, body: &str, labels: &[String]) -> ComplexityAnalysis {
    analyze_with_thresholds(title, body, labels, &ComplexityThresholds::default())
}

/// Score `(title, body, labels)` against caller-supplied thresholds, so
/// a deployment can retune the simple/complex boundary (spec.md §6's
/// `complexity_thresholds` config surface) without recompiling.
/// A score exactly on a boundary favors the lower bucket.
pub fn analyze_with_thresholds(
    title: &str,
    body: &str,
    labels: &[String],
    thresholds: &ComplexityThresholds,
) -> ComplexityAnalysis {
    let signals = gather_signals(title, body, labels);
    let score = score_signals(&signals).min(65);

    let (level, confidence, reasoning) = if score <= thresholds.simple_threshold {
        (ComplexityLevel::Simple, 0.85, "issue appears straightforward; a single agent can handle it")
    } else if score <= thresholds.complex_threshold {
        (
            ComplexityLevel::Uncertain,
            0.60,
            "complexity is unclear; start with a single agent but allow escalation",
        )
    } else {
        (ComplexityLevel::Complex, 0.90, "issue is complex; requires coordinator orchestration")
    };

    ComplexityAnalysis { level, score, confidence, reasoning: reasoning.to_string(), signals }
}

/// Convenience wrapper over an [`Issue`] snapshot using default thresholds.
pub fn analyze_issue(issue: &Issue) -> ComplexityAnalysis {
    analyze_issue_with_thresholds(issue, &ComplexityThresholds::default())
}

/// Convenience wrapper over an [`Issue`] snapshot using caller-supplied
/// thresholds.
pub fn analyze_issue_with_thresholds(issue: &Issue, thresholds: &ComplexityThresholds) -> ComplexityAnalysis {
    let labels: Vec<String> = issue.labels.iter().cloned().collect();
    analyze_with_thresholds(&issue.title, &issue.body, &labels, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_plain_issue_is_simple() {
        let analysis = analyze("Fix typo", "There's a typo in the README.", &[]);
        assert_eq!(analysis.level, ComplexityLevel::Simple);
    }

    #[test]
    fn architecture_keyword_alone_pushes_past_simple_threshold() {
        let analysis = analyze("Improve system", "We need to rework the system design here.", &[]);
        assert!(analysis.score > ComplexityThresholds::default().simple_threshold);
    }

    #[test]
    fn complex_label_and_refactor_keyword_reach_complex_bucket() {
        let body = "Refactor the whole ingestion pipeline across several services.\
            This touches multiple components and needs careful migration.";
        let analysis = analyze("Refactor ingestion", body, &["architecture".to_string()]);
        assert_eq!(analysis.level, ComplexityLevel::Complex);
    }

    #[test]
    fn file_mentions_and_checkboxes_are_counted() {
        let body = "- [ ] update main.rs\n- [ ] update lib.rs\n- [x] update config.rs\n```\ncode\n```";
        let analysis = analyze("Touch some files", body, &[]);
        assert_eq!(analysis.signals.file_mention_count, 3);
        assert_eq!(analysis.signals.checkbox_count, 3);
        assert_eq!(analysis.signals.code_block_count, 2);
    }

    #[test]
    fn dependency_mentions_are_capped_at_five_points() {
        let body = "depends on #1 depends on #2 depends on #3 depends on #4";
        let analysis = analyze("x", body, &[]);
        assert_eq!(analysis.signals.dependency_mention_count, 4);
    }

    #[test]
    fn custom_thresholds_change_the_bucket_for_the_same_score() {
        let body = "We need to rework the system design here.";
        let tight = ComplexityThresholds { simple_threshold: 1, complex_threshold: 5 };
        let analysis = analyze_with_thresholds("Improve system", body, &[], &tight);
        assert_eq!(analysis.level, ComplexityLevel::Complex);
    }

    #[test]
    fn a_score_exactly_on_the_boundary_favors_the_lower_bucket() {
        let thresholds = ComplexityThresholds { simple_threshold: 10, complex_threshold: 25 };
        // architecture keyword alone scores exactly 10: right at the
        // simple/uncertain boundary.
        let analysis = analyze_with_thresholds("x", "architecture", &[], &thresholds);
        assert_eq!(analysis.score, 10);
        assert_eq!(analysis.level, ComplexityLevel::Simple);
    }
}

//! Pure-function merge conflict complexity scoring (C14).

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::models::conflict::{ConflictAnalysis, ConflictMetrics, ConflictResolution};

const SIMPLE_THRESHOLD: u32 = 8;
const MODERATE_THRESHOLD: u32 = 15;

const CORE_FILE_PATTERNS: &[&str] =
    &["engine/core/", "engine/operations/", "__init__.py", "setup.py", "requirements.txt", "config/", "README.md"];

fn core_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Cargo\.toml|/mod\.rs$|src/main\.rs$|src/lib\.rs$").unwrap())
}

/// Whether `filename` is a core/critical path. Mirrors the original
/// substring patterns plus Rust-idiomatic equivalents (crate manifests
/// and module roots) via `core_file_re`.
pub fn is_core_file(filename: &str) -> bool {
    CORE_FILE_PATTERNS.iter().any(|p| filename.contains(p)) || core_file_re().is_match(filename)
}

fn score_metrics(m: &ConflictMetrics) -> u32 {
    let mut score = 0u32;

    score += if m.conflicted_files <= 2 {
        1
    } else if m.conflicted_files <= 5 {
        5
    } else {
        10
    };

    score += if m.conflict_markers <= 5 {
        2
    } else if m.conflict_markers <= 15 {
        6
    } else {
        10
    };

    score += if m.lines_affected <= 50 {
        1
    } else if m.lines_affected <= 200 {
        5
    } else {
        10
    };

    if m.files_overlap {
        score += 5;
    }

    score += if m.age_days <= 1 {
        0
    } else if m.age_days <= 3 {
        2
    } else {
        5
    };

    score += if m.commits_behind <= 3 {
        1
    } else if m.commits_behind <= 10 {
        5
    } else {
        10
    };

    if m.core_files_affected {
        score += 5;
    }

    score
}

pub fn analyze(metrics: ConflictMetrics) -> ConflictAnalysis {
    let score = score_metrics(&metrics);

    let (recommended_action, reasoning) = if score <= SIMPLE_THRESHOLD {
        (ConflictResolution::AutoResolve, "conflicts are minimal and can be auto-resolved via rebase")
    } else if score <= MODERATE_THRESHOLD {
        (ConflictResolution::ManualFix, "conflicts require manual review but are manageable")
    } else {
        (
            ConflictResolution::CloseAndRecreate,
            "conflicts are too complex; recreating the PR from scratch is more efficient",
        )
    };

    ConflictAnalysis { score, recommended_action, reasoning: reasoning.to_string(), metrics }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_conflict_auto_resolves() {
        let analysis = analyze(ConflictMetrics::default());
        assert_eq!(analysis.recommended_action, ConflictResolution::AutoResolve);
    }

    #[test]
    fn heavy_conflict_recommends_close_and_recreate() {
        let metrics = ConflictMetrics {
            conflicted_files: 8,
            conflict_markers: 20,
            lines_affected: 500,
            files_overlap: true,
            age_days: 10,
            commits_behind: 15,
            total_files_changed: 20,
            core_files_affected: true,
        };
        let analysis = analyze(metrics);
        assert_eq!(analysis.recommended_action, ConflictResolution::CloseAndRecreate);
        assert!(analysis.score > MODERATE_THRESHOLD);
    }

    #[test]
    fn moderate_conflict_recommends_manual_fix() {
        let metrics = ConflictMetrics {
            conflicted_files: 4,
            conflict_markers: 10,
            lines_affected: 100,
            files_overlap: false,
            age_days: 2,
            commits_behind: 5,
            total_files_changed: 6,
            core_files_affected: false,
        };
        let analysis = analyze(metrics);
        assert_eq!(analysis.recommended_action, ConflictResolution::ManualFix);
    }

    #[test]
    fn core_file_patterns_are_recognized() {
        assert!(is_core_file("engine/core/rate_limiter.py"));
        assert!(is_core_file("Cargo.toml"));
        assert!(is_core_file("src/domain/mod.rs"));
        assert!(!is_core_file("docs/notes.md"));
    }
}

//! Issue snapshot domain model.
//!
//! An `Issue` is an immutable snapshot taken at the start of one pipeline
//! run; it is never mutated in place, only re-fetched for the next run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of an issue on its forge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueKey {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl std::fmt::Display for IssueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: IssueKey,
    pub title: String,
    pub body: String,
    pub labels: HashSet<String>,
    pub assignees: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Issue {
        Issue {
            key: IssueKey { owner: "o".into(), repo: "r".into(), number: 1 },
            title: "Fix bug".into(),
            body: "steps to repro".into(),
            labels: ["bug".to_string()].into_iter().collect(),
            assignees: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn has_label_is_case_insensitive() {
        let issue = sample();
        assert!(issue.has_label("BUG"));
        assert!(!issue.has_label("enhancement"));
    }

    #[test]
    fn key_display_matches_owner_repo_number() {
        let issue = sample();
        assert_eq!(issue.key.to_string(), "o/r#1");
    }
}

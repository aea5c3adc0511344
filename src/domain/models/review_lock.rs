//! Advisory lock over one `(repo, pr_number)` pair, held for the duration
//! of a PR workflow run so two coordinators never review the same PR at
//! once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewLockKey {
    pub repo: String,
    pub pr_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLock {
    pub key: ReviewLockKey,
    pub holder_id: String,
    pub acquired_at: DateTime<Utc>,
}

impl ReviewLock {
    pub fn new(repo: impl Into<String>, pr_number: u64, holder_id: impl Into<String>) -> Self {
        Self {
            key: ReviewLockKey { repo: repo.into(), pr_number },
            holder_id: holder_id.into(),
            acquired_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_keys_with_same_repo_and_pr_are_equal() {
        let a = ReviewLockKey { repo: "o/r".into(), pr_number: 7 };
        let b = ReviewLockKey { repo: "o/r".into(), pr_number: 7 };
        assert_eq!(a, b);
    }
}

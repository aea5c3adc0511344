//! Fixture builders shared across the scenario integration tests.

use chrono::Utc;
use swarmctl::domain::models::issue::{Issue, IssueKey};
use swarmctl::domain::ports::forge::PullRequest;

pub fn issue(owner: &str, repo: &str, number: u64, title: &str, body: &str, labels: &[&str]) -> Issue {
    Issue {
        key: IssueKey { owner: owner.to_string(), repo: repo.to_string(), number },
        title: title.to_string(),
        body: body.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        assignees: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn pull_request(repo: &str, number: u64, author: &str) -> PullRequest {
    PullRequest {
        repo: repo.to_string(),
        number,
        author: author.to_string(),
        title: "add feature".to_string(),
        body: String::new(),
        base_branch: "main".to_string(),
        head_branch: "feature".to_string(),
        mergeable: Some(true),
        commits_behind_base: 0,
    }
}

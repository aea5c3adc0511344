//! In-memory [`ForgePort`] used by application-layer tests. Grounded in
//! the teacher's `adapters::substrates::mock` pattern: a `Mutex`-guarded
//! fixture that records calls and lets tests assert on side effects
//! without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::issue::{Issue, IssueKey};
use crate::domain::ports::forge::{
    ForgePort, Invitation, IssueListFilter, MergeMethod, NewIssue, Permission, PrFile, PullRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Comment { repo: String, number: u64, body: String },
    AddLabels { repo: String, number: u64, labels: Vec<String> },
    RemoveLabel { repo: String, number: u64, label: String },
    RequestReviewers { repo: String, number: u64, reviewers: Vec<String> },
    SetAssignees { repo: String, number: u64, assignees: Vec<String> },
    ConvertToDraft { repo: String, number: u64 },
    MarkReady { repo: String, number: u64 },
    ClosePr { repo: String, number: u64 },
    MergePr { repo: String, number: u64 },
    CreateIssue { repo: String, title: String },
}

#[derive(Default)]
struct Fixture {
    issues: HashMap<(String, u64), Issue>,
    prs: HashMap<(String, u64), PullRequest>,
    pr_files: HashMap<(String, u64), Vec<PrFile>>,
    calls: Vec<RecordedCall>,
    next_issue_number: u64,
    deny_merge: bool,
}

/// A fully in-process forge double. Cheap to construct per test; share
/// via `Arc` when multiple components need to observe the same state.
pub struct MockForgeClient {
    state: Mutex<Fixture>,
    /// Artificial delay before `list_pr_files` returns, so a test driving
    /// two concurrent callers (e.g. racing `PrWorkflow::run` against a
    /// `ReviewLock`) has a real await point to interleave on.
    latency: Option<Duration>,
}

impl Default for MockForgeClient {
    fn default() -> Self {
        Self { state: Mutex::new(Fixture { next_issue_number: 1, ..Fixture::default() }), latency: None }
    }
}

impl MockForgeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every `list_pr_files` call an artificial delay, to widen the
    /// window for a concurrent-access test to land its second call while
    /// the first is still in flight.
    pub fn with_latency(mut self, delay: Duration) -> Self {
        self.latency = Some(delay);
        self
    }

    pub fn with_issue(self, repo: &str, issue: Issue) -> Self {
        self.state.lock().unwrap().issues.insert((repo.to_string(), issue.key.number), issue);
        self
    }

    pub fn with_pr(self, repo: &str, pr: PullRequest) -> Self {
        self.state.lock().unwrap().prs.insert((repo.to_string(), pr.number), pr);
        self
    }

    pub fn with_pr_files(self, repo: &str, number: u64, files: Vec<PrFile>) -> Self {
        self.state.lock().unwrap().pr_files.insert((repo.to_string(), number), files);
        self
    }

    pub fn deny_next_merge(&self) {
        self.state.lock().unwrap().deny_merge = true;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn comment_count(&self, repo: &str, number: u64) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::Comment { repo: r, number: n, .. } if r == repo && *n == number))
            .count()
    }
}

#[async_trait]
impl ForgePort for MockForgeClient {
    async fn list_issues(&self, repo: &str, filter: IssueListFilter) -> CoreResult<Vec<Issue>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .issues
            .values()
            .filter(|i| i.key.repo == repo || format!("{}/{}", i.key.owner, i.key.repo) == repo)
            .filter(|i| filter.labels.iter().all(|l| i.has_label(l)))
            .cloned()
            .collect())
    }

    async fn get_issue(&self, repo: &str, number: u64) -> CoreResult<Issue> {
        let state = self.state.lock().unwrap();
        state
            .issues
            .get(&(repo.to_string(), number))
            .cloned()
            .ok_or_else(|| CoreError::PlatformError(format!("no such issue {repo}#{number}")))
    }

    async fn comment_issue(&self, repo: &str, number: u64, body: &str) -> CoreResult<()> {
        self.add_comment(repo, number, body).await
    }

    async fn get_pr(&self, repo: &str, number: u64) -> CoreResult<PullRequest> {
        let state = self.state.lock().unwrap();
        state
            .prs
            .get(&(repo.to_string(), number))
            .cloned()
            .ok_or_else(|| CoreError::PlatformError(format!("no such pr {repo}#{number}")))
    }

    async fn list_pr_files(&self, repo: &str, number: u64) -> CoreResult<Vec<PrFile>> {
        if let Some(delay) = self.latency {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        Ok(state.pr_files.get(&(repo.to_string(), number)).cloned().unwrap_or_default())
    }

    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Comment { repo: repo.to_string(), number, body: body.to_string() });
        Ok(())
    }

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(issue) = state.issues.get_mut(&(repo.to_string(), number)) {
            issue.labels.extend(labels.iter().cloned());
        }
        state.calls.push(RecordedCall::AddLabels { repo: repo.to_string(), number, labels: labels.to_vec() });
        Ok(())
    }

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(issue) = state.issues.get_mut(&(repo.to_string(), number)) {
            issue.labels.retain(|l| l != label);
        }
        state.calls.push(RecordedCall::RemoveLabel { repo: repo.to_string(), number, label: label.to_string() });
        Ok(())
    }

    async fn request_reviewers(&self, repo: &str, number: u64, reviewers: &[String]) -> CoreResult<()> {
        self.state.lock().unwrap().calls.push(RecordedCall::RequestReviewers {
            repo: repo.to_string(),
            number,
            reviewers: reviewers.to_vec(),
        });
        Ok(())
    }

    async fn set_assignees(&self, repo: &str, number: u64, assignees: &[String]) -> CoreResult<()> {
        self.state.lock().unwrap().calls.push(RecordedCall::SetAssignees {
            repo: repo.to_string(),
            number,
            assignees: assignees.to_vec(),
        });
        Ok(())
    }

    async fn convert_pr_to_draft(&self, repo: &str, number: u64) -> CoreResult<()> {
        self.state.lock().unwrap().calls.push(RecordedCall::ConvertToDraft { repo: repo.to_string(), number });
        Ok(())
    }

    async fn mark_pr_ready(&self, repo: &str, number: u64) -> CoreResult<()> {
        self.state.lock().unwrap().calls.push(RecordedCall::MarkReady { repo: repo.to_string(), number });
        Ok(())
    }

    async fn close_pr(&self, repo: &str, number: u64) -> CoreResult<()> {
        self.state.lock().unwrap().calls.push(RecordedCall::ClosePr { repo: repo.to_string(), number });
        Ok(())
    }

    async fn merge_pr(
        &self,
        repo: &str,
        number: u64,
        _method: MergeMethod,
        _commit_title: Option<&str>,
        _commit_message: Option<&str>,
    ) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.deny_merge {
            state.deny_merge = false;
            return Err(CoreError::PlatformError("merge conflict".to_string()));
        }
        state.calls.push(RecordedCall::MergePr { repo: repo.to_string(), number });
        Ok(())
    }

    async fn create_issue(&self, repo: &str, issue: NewIssue) -> CoreResult<u64> {
        let mut state = self.state.lock().unwrap();
        let number = state.next_issue_number;
        state.next_issue_number += 1;
        state.calls.push(RecordedCall::CreateIssue { repo: repo.to_string(), title: issue.title.clone() });
        let now = Utc::now();
        let (owner, name) = repo.split_once('/').unwrap_or(("", repo));
        state.issues.insert(
            (repo.to_string(), number),
            Issue {
                key: IssueKey { owner: owner.to_string(), repo: name.to_string(), number },
                title: issue.title,
                body: issue.body,
                labels: issue.labels.into_iter().collect(),
                assignees: issue.assignees,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(number)
    }

    async fn invite_collaborator(&self, _repo: &str, _user: &str, _permission: Permission) -> CoreResult<()> {
        Ok(())
    }

    async fn list_invitations(&self, _user: &str) -> CoreResult<Vec<Invitation>> {
        Ok(vec![])
    }

    async fn accept_invitation(&self, _invitation_id: u64) -> CoreResult<()> {
        Ok(())
    }

    async fn check_access(&self, _repo: &str, _user: &str) -> CoreResult<Option<Permission>> {
        Ok(Some(Permission::Write))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(number: u64) -> Issue {
        Issue {
            key: IssueKey { owner: "o".into(), repo: "r".into(), number },
            title: "Fix bug".into(),
            body: "steps".into(),
            labels: Default::default(),
            assignees: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn add_comment_is_recorded_and_counted() {
        let forge = MockForgeClient::new();
        forge.add_comment("o/r", 1, "hello").await.unwrap();
        forge.add_comment("o/r", 1, "hello").await.unwrap();
        assert_eq!(forge.comment_count("o/r", 1), 2);
    }

    #[tokio::test]
    async fn add_labels_mutates_the_stored_issue() {
        let forge = MockForgeClient::new().with_issue("o/r", issue(1));
        forge.add_labels("o/r", 1, &["needs-coordination".to_string()]).await.unwrap();
        let updated = forge.get_issue("o/r", 1).await.unwrap();
        assert!(updated.has_label("needs-coordination"));
    }

    #[tokio::test]
    async fn merge_pr_can_be_denied_once() {
        let forge = MockForgeClient::new();
        forge.deny_next_merge();
        let result = forge.merge_pr("o/r", 1, MergeMethod::Squash, None, None).await;
        assert!(result.is_err());
        forge.merge_pr("o/r", 1, MergeMethod::Squash, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn create_issue_assigns_increasing_numbers() {
        let forge = MockForgeClient::new();
        let first = forge.create_issue("o/r", NewIssue { title: "a".into(), ..Default::default() }).await.unwrap();
        let second = forge.create_issue("o/r", NewIssue { title: "b".into(), ..Default::default() }).await.unwrap();
        assert_eq!(second, first + 1);
    }
}

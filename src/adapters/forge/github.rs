//! GitHub REST API v3 adapter implementing [`ForgePort`].
//!
//! Grounded in the teacher's `adapters::plugins::github_issues::client`
//! typed-method-per-endpoint style. Every mutating call follows the
//! documented sequence: [`RateLimiter::check`] -> HTTP call ->
//! [`RateLimiter::observe_platform_limits`] from the response headers ->
//! [`RateLimiter::record`]. Reads call `check` with `ApiRead` but no
//! cooldown is configured for it.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use tracing::warn;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::issue::{Issue, IssueKey};
use crate::domain::models::rate_limit::OperationType;
use crate::domain::ports::forge::{
    ForgePort, Invitation, IssueListFilter, MergeMethod, NewIssue, Permission, PrFile, PullRequest,
};
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::infrastructure::retry::RetryPolicy;

use super::models::{
    GitHubAssigneesRequest, GitHubCommentRequest, GitHubCreateIssueRequest, GitHubCreateIssueResponse, GitHubFile,
    GitHubInviteRequest, GitHubInvitation, GitHubIssue, GitHubLabelsRequest, GitHubMergeRequest, GitHubPullRequest,
    GitHubReviewersRequest,
};

const GITHUB_API_BASE: &str = "https://api.github.com";

fn merge_method_str(method: MergeMethod) -> &'static str {
    match method {
        MergeMethod::Merge => "merge",
        MergeMethod::Squash => "squash",
        MergeMethod::Rebase => "rebase",
    }
}

fn permission_str(permission: Permission) -> &'static str {
    match permission {
        Permission::Read => "pull",
        Permission::Write => "push",
        Permission::Admin => "admin",
    }
}

fn parse_permission(raw: &str) -> Option<Permission> {
    match raw {
        "admin" => Some(Permission::Admin),
        "write" | "push" => Some(Permission::Write),
        "read" | "pull" | "triage" | "maintain" => Some(Permission::Read),
        _ => None,
    }
}

impl From<GitHubIssue> for Issue {
    fn from(gh: GitHubIssue) -> Self {
        // `repo`/`owner` aren't present on the per-issue payload; callers
        // fill them in from the request context via `with_repo`.
        Issue {
            key: IssueKey { owner: String::new(), repo: String::new(), number: gh.number },
            title: gh.title,
            body: gh.body.unwrap_or_default(),
            labels: gh.labels.into_iter().map(|l| l.name).collect::<HashSet<_>>(),
            assignees: gh.assignees.into_iter().map(|u| u.login).collect(),
            created_at: gh.created_at,
            updated_at: gh.updated_at,
        }
    }
}

fn with_repo(mut issue: Issue, owner: &str, repo: &str) -> Issue {
    issue.key.owner = owner.to_string();
    issue.key.repo = repo.to_string();
    issue
}

fn split_repo(repo: &str) -> CoreResult<(&str, &str)> {
    repo.split_once('/')
        .ok_or_else(|| CoreError::ValidationError(format!("repo {repo} must be in owner/name form")))
}

/// HTTP client for the GitHub REST API v3.
pub struct GitHubForgeClient {
    http: reqwest::Client,
    token: String,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl GitHubForgeClient {
    pub fn new(token: String, rate_limiter: Arc<RateLimiter>) -> Self {
        Self { http: reqwest::Client::new(), token, rate_limiter, retry: RetryPolicy::default() }
    }

    pub fn from_env(rate_limiter: Arc<RateLimiter>) -> CoreResult<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| CoreError::AuthError("GITHUB_TOKEN is not set".to_string()))?;
        Ok(Self::new(token, rate_limiter))
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "swarmctl")
    }

    fn observe_headers(&self, response: &reqwest::Response) {
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());
        if let Some(remaining) = remaining {
            let reset_at = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .unwrap_or_else(Utc::now);
            self.rate_limiter.observe_platform_limits(remaining, reset_at);
        }
    }

    /// Perform a mutating call gated by the rate limiter: check, call,
    /// observe platform headers, record.
    async fn mutate(
        &self,
        op: OperationType,
        target: &str,
        content: Option<&str>,
        call: impl std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    ) -> CoreResult<reqwest::Response> {
        let decision = self.rate_limiter.check(op, target, content);
        if !decision.is_allowed() {
            let reason = match decision {
                crate::infrastructure::rate_limiter::Decision::Deny(reason) => reason,
                crate::infrastructure::rate_limiter::Decision::Allow => unreachable!(),
            };
            return Err(CoreError::RateLimited(reason));
        }

        let result = call.await;
        match result {
            Ok(response) => {
                self.observe_headers(&response);
                let status = response.status();
                if status.is_success() {
                    self.rate_limiter.record(op, target, content, true);
                    Ok(response)
                } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    self.rate_limiter.record(op, target, content, false);
                    Err(CoreError::AuthError(format!("{status}")))
                } else {
                    self.rate_limiter.record(op, target, content, false);
                    Err(CoreError::PlatformError(format!("{status}")))
                }
            }
            Err(err) => {
                self.rate_limiter.record(op, target, content, false);
                Err(CoreError::from(err))
            }
        }
    }

    /// GET `url`, retrying transient platform failures. Idempotent by
    /// construction, so [`RetryPolicy::retry_idempotent`] applies directly.
    async fn read(&self, target: &str, url: &str) -> CoreResult<reqwest::Response> {
        let decision = self.rate_limiter.check(OperationType::ApiRead, target, None);
        if !decision.is_allowed() {
            let reason = match decision {
                crate::infrastructure::rate_limiter::Decision::Deny(reason) => reason,
                crate::infrastructure::rate_limiter::Decision::Allow => unreachable!(),
            };
            return Err(CoreError::RateLimited(reason));
        }

        let result = self
            .retry
            .retry_idempotent(|| async {
                let response = self.request(Method::GET, url).send().await.map_err(CoreError::from)?;
                let status = response.status();
                if status.is_success() {
                    Ok(response)
                } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    Err(CoreError::AuthError(format!("{status}")))
                } else {
                    Err(CoreError::PlatformError(format!("{status}")))
                }
            })
            .await;

        match &result {
            Ok(response) => {
                self.observe_headers(response);
                self.rate_limiter.record(OperationType::ApiRead, target, None, true);
            }
            Err(_) => self.rate_limiter.record(OperationType::ApiRead, target, None, false),
        }
        result
    }
}

#[async_trait]
impl ForgePort for GitHubForgeClient {
    async fn list_issues(&self, repo: &str, filter: IssueListFilter) -> CoreResult<Vec<Issue>> {
        let (owner, name) = split_repo(repo)?;
        let state = filter.state.unwrap_or_else(|| "open".to_string());
        let mut url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues?state={state}&per_page=100");
        if let Some(assignee) = &filter.assignee {
            url.push_str(&format!("&assignee={assignee}"));
        }
        if !filter.labels.is_empty() {
            url.push_str(&format!("&labels={}", filter.labels.join(",")));
        }
        let response = self.read(repo, &url).await?;
        let issues: Vec<GitHubIssue> = response.json().await.map_err(CoreError::from)?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| with_repo(Issue::from(i), owner, name))
            .collect())
    }

    async fn get_issue(&self, repo: &str, number: u64) -> CoreResult<Issue> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues/{number}");
        let response = self.read(repo, &url).await?;
        let gh_issue: GitHubIssue = response.json().await.map_err(CoreError::from)?;
        Ok(with_repo(Issue::from(gh_issue), owner, name))
    }

    async fn comment_issue(&self, repo: &str, number: u64, body: &str) -> CoreResult<()> {
        self.add_comment(repo, number, body).await
    }

    async fn get_pr(&self, repo: &str, number: u64) -> CoreResult<PullRequest> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}");
        let response = self.read(repo, &url).await?;
        let pr: GitHubPullRequest = response.json().await.map_err(CoreError::from)?;
        Ok(PullRequest {
            repo: repo.to_string(),
            number,
            author: pr.user.login,
            title: pr.title,
            body: pr.body.unwrap_or_default(),
            base_branch: pr.base.ref_name,
            head_branch: pr.head.ref_name,
            mergeable: pr.mergeable,
            commits_behind_base: 0,
        })
    }

    async fn list_pr_files(&self, repo: &str, number: u64) -> CoreResult<Vec<PrFile>> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}/files?per_page=100");
        let response = self.read(repo, &url).await?;
        let files: Vec<GitHubFile> = response.json().await.map_err(CoreError::from)?;
        Ok(files
            .into_iter()
            .map(|f| PrFile { filename: f.filename, additions: f.additions, deletions: f.deletions, patch: f.patch })
            .collect())
    }

    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues/{number}/comments");
        let req = GitHubCommentRequest { body: body.to_string() };
        let target = format!("{repo}#{number}");
        self.mutate(
            OperationType::IssueComment,
            &target,
            Some(body),
            self.request(Method::POST, &url).json(&req).send(),
        )
        .await?;
        Ok(())
    }

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues/{number}/labels");
        let req = GitHubLabelsRequest { labels: labels.to_vec() };
        let target = format!("{repo}#{number}");
        self.mutate(OperationType::LabelUpdate, &target, None, self.request(Method::POST, &url).json(&req).send())
            .await?;
        Ok(())
    }

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues/{number}/labels/{label}");
        let target = format!("{repo}#{number}");
        self.mutate(OperationType::LabelUpdate, &target, None, self.request(Method::DELETE, &url).send()).await?;
        Ok(())
    }

    async fn request_reviewers(&self, repo: &str, number: u64, reviewers: &[String]) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}/requested_reviewers");
        let req = GitHubReviewersRequest { reviewers: reviewers.to_vec() };
        let target = format!("{repo}#{number}");
        self.mutate(OperationType::Assignment, &target, None, self.request(Method::POST, &url).json(&req).send())
            .await?;
        Ok(())
    }

    async fn set_assignees(&self, repo: &str, number: u64, assignees: &[String]) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues/{number}/assignees");
        let req = GitHubAssigneesRequest { assignees: assignees.to_vec() };
        let target = format!("{repo}#{number}");
        self.mutate(OperationType::Assignment, &target, None, self.request(Method::POST, &url).json(&req).send())
            .await?;
        Ok(())
    }

    async fn convert_pr_to_draft(&self, repo: &str, number: u64) -> CoreResult<()> {
        // GitHub exposes draft conversion through the GraphQL API; the
        // REST surface has no direct endpoint, so this goes through the
        // same PATCH-style issue update slot other ports use, tracked as
        // a PrUpdate for rate-limiting purposes.
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}");
        let target = format!("{repo}#{number}");
        warn!(repo, number, "convert_pr_to_draft uses the REST PATCH fallback, not GraphQL markPullRequestReadyForReview");
        self.mutate(
            OperationType::PrUpdate,
            &target,
            None,
            self.request(Method::PATCH, &url).json(&serde_json::json!({"draft": true})).send(),
        )
        .await?;
        Ok(())
    }

    async fn mark_pr_ready(&self, repo: &str, number: u64) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}");
        let target = format!("{repo}#{number}");
        self.mutate(
            OperationType::PrUpdate,
            &target,
            None,
            self.request(Method::PATCH, &url).json(&serde_json::json!({"draft": false})).send(),
        )
        .await?;
        Ok(())
    }

    async fn close_pr(&self, repo: &str, number: u64) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}");
        let target = format!("{repo}#{number}");
        self.mutate(
            OperationType::PrUpdate,
            &target,
            None,
            self.request(Method::PATCH, &url).json(&serde_json::json!({"state": "closed"})).send(),
        )
        .await?;
        Ok(())
    }

    async fn merge_pr(
        &self,
        repo: &str,
        number: u64,
        method: MergeMethod,
        commit_title: Option<&str>,
        commit_message: Option<&str>,
    ) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/pulls/{number}/merge");
        let req = GitHubMergeRequest {
            merge_method: merge_method_str(method).to_string(),
            commit_title: commit_title.map(str::to_string),
            commit_message: commit_message.map(str::to_string),
        };
        let target = format!("{repo}#{number}");
        self.mutate(OperationType::PrUpdate, &target, None, self.request(Method::PUT, &url).json(&req).send()).await?;
        Ok(())
    }

    async fn create_issue(&self, repo: &str, issue: NewIssue) -> CoreResult<u64> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/issues");
        let req = GitHubCreateIssueRequest {
            title: issue.title,
            body: Some(issue.body.clone()),
            labels: issue.labels,
            assignees: issue.assignees,
        };
        let response = self
            .mutate(OperationType::IssueCreate, repo, Some(&issue.body), self.request(Method::POST, &url).json(&req).send())
            .await?;
        let created: GitHubCreateIssueResponse = response.json().await.map_err(CoreError::from)?;
        Ok(created.number)
    }

    async fn invite_collaborator(&self, repo: &str, user: &str, permission: Permission) -> CoreResult<()> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/collaborators/{user}");
        let req = GitHubInviteRequest { permission: permission_str(permission).to_string() };
        self.mutate(OperationType::Assignment, repo, None, self.request(Method::PUT, &url).json(&req).send()).await?;
        Ok(())
    }

    async fn list_invitations(&self, user: &str) -> CoreResult<Vec<Invitation>> {
        let url = format!("{GITHUB_API_BASE}/user/repository_invitations");
        let response = self.read(user, &url).await?;
        let invitations: Vec<GitHubInvitation> = response.json().await.map_err(CoreError::from)?;
        Ok(invitations
            .into_iter()
            .map(|i| Invitation {
                id: i.id,
                repo: String::new(),
                invitee: user.to_string(),
                permission: i.permissions.as_deref().and_then(parse_permission).unwrap_or(Permission::Read),
            })
            .collect())
    }

    async fn accept_invitation(&self, invitation_id: u64) -> CoreResult<()> {
        let url = format!("{GITHUB_API_BASE}/user/repository_invitations/{invitation_id}");
        self.mutate(OperationType::Assignment, &invitation_id.to_string(), None, self.request(Method::PATCH, &url).send())
            .await?;
        Ok(())
    }

    async fn check_access(&self, repo: &str, user: &str) -> CoreResult<Option<Permission>> {
        let (owner, name) = split_repo(repo)?;
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/collaborators/{user}/permission");
        match self.read(repo, &url).await {
            Ok(response) => {
                let payload: serde_json::Value = response.json().await.map_err(CoreError::from)?;
                Ok(payload.get("permission").and_then(|v| v.as_str()).and_then(parse_permission))
            }
            Err(CoreError::PlatformError(status)) if status.contains("404") => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_repo_requires_owner_slash_name() {
        assert!(split_repo("owner/name").is_ok());
        assert!(split_repo("bare").is_err());
    }

    #[test]
    fn merge_method_mapping() {
        assert_eq!(merge_method_str(MergeMethod::Squash), "squash");
        assert_eq!(merge_method_str(MergeMethod::Rebase), "rebase");
    }

    #[test]
    fn permission_roundtrips_through_github_strings() {
        assert_eq!(parse_permission("admin"), Some(Permission::Admin));
        assert_eq!(parse_permission("push"), Some(Permission::Write));
        assert_eq!(parse_permission("triage"), Some(Permission::Read));
        assert_eq!(parse_permission("unknown"), None);
    }
}

//! Pull-request review/merge state machine (C13).
//!
//! Drives one PR through `Locked -> Reviewed -> Labeled ->
//! AssignedReviewers -> Decided -> {Merged | Drafted | Parked}`, always
//! releasing its [`ReviewLock`] on the way out — including every early
//! exit (self-review guard, unresolvable conflicts). The lock itself is
//! process-local: a best-effort guard against two concurrent `pr review`
//! invocations racing on the same PR, not a distributed lock.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::conflict_analyzer;
use crate::domain::errors::CoreResult;
use crate::domain::merge_decider;
use crate::domain::models::conflict::{ConflictMetrics, ConflictResolution};
use crate::domain::models::review::MergeRecommendation;
use crate::domain::models::review_lock::ReviewLockKey;
use crate::domain::ports::forge::{ForgePort, MergeMethod, PullRequest};

use super::review_engine::ReviewEngine;

/// Outcome of one `PrWorkflow::run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrWorkflowOutcome {
    /// Nothing was done: concurrent run in progress, or self-review.
    Skipped { reason: String },
    /// Closed for conflicts too complex to resolve automatically.
    ClosedForConflicts,
    /// Labeled for manual conflict resolution, review not performed.
    ParkedForConflicts,
    Merged { recommendation: MergeRecommendation },
    Drafted { critical_count: usize },
    Parked { recommendation: MergeRecommendation },
}

fn merge_method_for(setting: crate::domain::models::config::MergeMethodSetting) -> MergeMethod {
    use crate::domain::models::config::MergeMethodSetting as S;
    match setting {
        S::Merge => MergeMethod::Merge,
        S::Squash => MergeMethod::Squash,
        S::Rebase => MergeMethod::Rebase,
    }
}

fn labels_for(result: &crate::domain::models::review::PrReviewResult, config: &crate::domain::models::config::ReviewMergeConfig) -> Vec<String> {
    let critical = result.critical_count();
    let mut labels = Vec::new();
    labels.push(if critical > 0 {
        "needs-work".to_string()
    } else if !result.approved {
        "changes-requested".to_string()
    } else if result.issues.is_empty() {
        "approved".to_string()
    } else {
        "approved-with-suggestions".to_string()
    });
    if result.approved {
        labels.push("ready-for-merge".to_string());
    }
    if critical > 0 {
        labels.push("critical-issues".to_string());
    }
    labels.push(if config.use_llm { "ai-reviewed".to_string() } else { "static-reviewed".to_string() });
    labels
}

/// Drives one pull request through review, labeling, reviewer
/// assignment, and the merge decision.
pub struct PrWorkflow {
    forge: Arc<dyn ForgePort>,
    review_engine: Arc<ReviewEngine>,
    config: crate::domain::models::config::ReviewMergeConfig,
    self_review_identity: String,
    locks: Mutex<HashSet<ReviewLockKey>>,
}

impl PrWorkflow {
    pub fn new(
        forge: Arc<dyn ForgePort>,
        review_engine: Arc<ReviewEngine>,
        config: crate::domain::models::config::ReviewMergeConfig,
        self_review_identity: impl Into<String>,
    ) -> Self {
        Self {
            forge,
            review_engine,
            config,
            self_review_identity: self_review_identity.into(),
            locks: Mutex::new(HashSet::new()),
        }
    }

    async fn try_acquire(&self, key: &ReviewLockKey) -> bool {
        let mut locks = self.locks.lock().await;
        if locks.contains(key) {
            false
        } else {
            locks.insert(key.clone());
            true
        }
    }

    async fn release(&self, key: &ReviewLockKey) {
        self.locks.lock().await.remove(key);
    }

    pub async fn run(&self, pr: &PullRequest, workspace: Option<&std::path::Path>) -> CoreResult<PrWorkflowOutcome> {
        let key = ReviewLockKey { repo: pr.repo.clone(), pr_number: pr.number };
        if !self.try_acquire(&key).await {
            return Ok(PrWorkflowOutcome::Skipped { reason: "review already in progress for this PR".to_string() });
        }

        let outcome = self.run_locked(pr, workspace).await;
        self.release(&key).await;
        outcome
    }

    async fn run_locked(&self, pr: &PullRequest, workspace: Option<&std::path::Path>) -> CoreResult<PrWorkflowOutcome> {
        if pr.author == self.self_review_identity {
            return Ok(PrWorkflowOutcome::Skipped { reason: "author matches the reviewing identity".to_string() });
        }

        if pr.mergeable == Some(false) {
            if let Some(outcome) = self.handle_conflicts(pr).await? {
                return Ok(outcome);
            }
        }

        let files = self.forge.list_pr_files(&pr.repo, pr.number).await?;
        let result = self.review_engine.review(&files, workspace).await?;

        let comment = format!(
            "Review for PR #{}: {} issue(s) ({} critical, {} warning). Approved: {}.",
            pr.number,
            result.issues.len(),
            result.critical_count(),
            result.warning_count(),
            result.approved
        );
        self.forge.comment_deduped(&pr.repo, pr.number, &comment).await?;

        if self.config.auto_assign_reviewers && !self.config.reviewers.is_empty() {
            let reviewers: Vec<String> = self.config.reviewers.iter().filter(|r| *r != &pr.author).cloned().collect();
            if !reviewers.is_empty() {
                self.forge.request_reviewers(&pr.repo, pr.number, &reviewers).await?;
            }
        }

        if self.config.auto_label {
            self.forge.add_labels(&pr.repo, pr.number, &labels_for(&result, &self.config)).await?;
        }

        let decision = merge_decider::decide(&result);
        self.apply_decision(pr, &decision).await
    }

    async fn handle_conflicts(&self, pr: &PullRequest) -> CoreResult<Option<PrWorkflowOutcome>> {
        let files = self.forge.list_pr_files(&pr.repo, pr.number).await?;
        let metrics = ConflictMetrics {
            conflicted_files: files.iter().filter(|f| f.patch.as_deref().is_some_and(|p| p.contains("<<<<<<<"))).count() as u32,
            conflict_markers: files.iter().filter_map(|f| f.patch.as_deref()).map(|p| p.matches("<<<<<<<").count() as u32).sum(),
            lines_affected: files.iter().map(|f| f.additions + f.deletions).sum(),
            files_overlap: false,
            age_days: 0,
            commits_behind: pr.commits_behind_base,
            total_files_changed: files.len() as u32,
            core_files_affected: files.iter().any(|f| conflict_analyzer::is_core_file(&f.filename)),
        };
        let analysis = conflict_analyzer::analyze(metrics);

        match analysis.recommended_action {
            ConflictResolution::AutoResolve => Ok(None),
            ConflictResolution::ManualFix => {
                self.forge
                    .comment_deduped(&pr.repo, pr.number, &format!("Merge conflicts need manual resolution: {}", analysis.reasoning))
                    .await?;
                self.forge.add_labels(&pr.repo, pr.number, &["merge-conflict".to_string()]).await?;
                Ok(Some(PrWorkflowOutcome::ParkedForConflicts))
            }
            ConflictResolution::CloseAndRecreate => {
                self.forge
                    .comment_deduped(
                        &pr.repo,
                        pr.number,
                        &format!("Closing: conflicts are too complex to resolve in place ({}).", analysis.reasoning),
                    )
                    .await?;
                self.forge.close_pr(&pr.repo, pr.number).await?;
                Ok(Some(PrWorkflowOutcome::ClosedForConflicts))
            }
        }
    }

    async fn apply_decision(
        &self,
        pr: &PullRequest,
        decision: &crate::domain::models::review::MergeDecision,
    ) -> CoreResult<PrWorkflowOutcome> {
        match decision.recommendation {
            MergeRecommendation::DoNotMerge if decision.critical_count > 0 => {
                self.forge.convert_pr_to_draft(&pr.repo, pr.number).await?;
                self.forge
                    .comment_deduped(&pr.repo, pr.number, &format!("Converted to draft: {}", decision.reason))
                    .await?;
                Ok(PrWorkflowOutcome::Drafted { critical_count: decision.critical_count })
            }
            MergeRecommendation::AutoMerge if self.config.auto_merge_if_approved => {
                self.merge(pr, decision.recommendation).await
            }
            MergeRecommendation::MergeWithConsideration if self.config.merge_with_suggestions => {
                self.merge(pr, decision.recommendation).await
            }
            recommendation => Ok(PrWorkflowOutcome::Parked { recommendation }),
        }
    }

    async fn merge(&self, pr: &PullRequest, recommendation: MergeRecommendation) -> CoreResult<PrWorkflowOutcome> {
        let method = merge_method_for(self.config.merge_method);
        self.forge.merge_pr(&pr.repo, pr.number, method, None, None).await?;
        Ok(PrWorkflowOutcome::Merged { recommendation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::forge::mock::MockForgeClient;
    use crate::domain::models::config::ReviewMergeConfig;
    use crate::domain::ports::forge::PrFile;
    use crate::infrastructure::sandbox::ShellSandbox;

    fn pr(repo: &str, number: u64, author: &str) -> PullRequest {
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

    fn workflow(forge: Arc<MockForgeClient>, config: ReviewMergeConfig) -> PrWorkflow {
        let engine = Arc::new(ReviewEngine::new(Arc::new(ShellSandbox::with_defaults()), config.clone()));
        PrWorkflow::new(forge, engine, config, "swarmctl-bot")
    }

    #[tokio::test]
    async fn clean_pr_with_default_config_auto_merges() {
        let forge = Arc::new(
            MockForgeClient::new().with_pr_files("o/r", 1, vec![PrFile { filename: "a.rs".into(), additions: 1, deletions: 0, patch: Some("+fn f(){}".into()) }]),
        );
        let wf = workflow(forge.clone(), ReviewMergeConfig::default());
        let outcome = wf.run(&pr("o/r", 1, "alice"), None).await.unwrap();
        assert!(matches!(outcome, PrWorkflowOutcome::Merged { recommendation: MergeRecommendation::AutoMerge }));
        assert!(forge.calls().iter().any(|c| matches!(c, crate::adapters::forge::mock::RecordedCall::MergePr { .. })));
    }

    #[tokio::test]
    async fn self_authored_pr_is_skipped() {
        let forge = Arc::new(MockForgeClient::new());
        let wf = workflow(forge, ReviewMergeConfig::default());
        let outcome = wf.run(&pr("o/r", 1, "swarmctl-bot"), None).await.unwrap();
        assert!(matches!(outcome, PrWorkflowOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn critical_issue_converts_to_draft_instead_of_merging() {
        let forge = Arc::new(
            MockForgeClient::new().with_pr_files(
                "o/r",
                1,
                vec![PrFile {
                    filename: "llm-critique".into(),
                    additions: 1,
                    deletions: 0,
                    patch: Some("+let x = unsafe { transmute(y) };".into()),
                }],
            ),
        );
        // Force a critical finding deterministically via the static scanner's
        // TODO marker path is not critical, so use the LLM critique path.
        let mut config = ReviewMergeConfig::default();
        config.use_llm = true;
        let llm = Arc::new(crate::adapters::llm::mock::MockLlmClient::new());
        llm.queue_response("[CRITICAL] unsafe transmute with no justification");
        let engine = Arc::new(ReviewEngine::new(Arc::new(ShellSandbox::with_defaults()), config.clone()).with_llm(llm));
        let wf = PrWorkflow::new(forge.clone(), engine, config, "swarmctl-bot");

        let outcome = wf.run(&pr("o/r", 1, "alice"), None).await.unwrap();
        assert!(matches!(outcome, PrWorkflowOutcome::Drafted { critical_count: 1 }));
        assert!(forge.calls().iter().any(|c| matches!(c, crate::adapters::forge::mock::RecordedCall::ConvertToDraft { .. })));
    }

    #[tokio::test]
    async fn heavy_conflicts_close_the_pr_without_reviewing() {
        let mut marker_patch = "<<<<<<<\n".repeat(20);
        marker_patch.push_str("=======\n>>>>>>>\n");
        let forge = Arc::new(
            MockForgeClient::new().with_pr_files(
                "o/r",
                1,
                vec![PrFile { filename: "core/engine.rs".into(), additions: 600, deletions: 600, patch: Some(marker_patch) }],
            ),
        );
        let mut conflicted = pr("o/r", 1, "alice");
        conflicted.mergeable = Some(false);
        conflicted.commits_behind_base = 50;
        let wf = workflow(forge.clone(), ReviewMergeConfig::default());
        let outcome = wf.run(&conflicted, None).await.unwrap();
        assert_eq!(outcome, PrWorkflowOutcome::ClosedForConflicts);
        assert!(forge.calls().iter().any(|c| matches!(c, crate::adapters::forge::mock::RecordedCall::ClosePr { .. })));
    }
}

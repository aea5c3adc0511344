//! Issue triage and routing (C6).
//!
//! `CoordinatorGateway::route` is the single entry point merging what
//! the distilled spec described as a separate "coordinator agent" and
//! "coordinator gateway" into one async method (SPEC_FULL.md §9's
//! resolved open question): score the issue's complexity, decide
//! whether to delegate it directly or hand it to the [`Planner`] for
//! orchestration, and post exactly one decision comment either way.

use std::sync::Arc;

use crate::domain::complexity;
use crate::domain::errors::CoreResult;
use crate::domain::models::complexity::ComplexityLevel;
use crate::domain::models::config::ComplexityThresholds;
use crate::domain::models::issue::Issue;
use crate::domain::ports::forge::{ForgePort, NewIssue};
use crate::domain::ports::llm::{CompletionRequest, LlmPort};

use super::planner::Planner;
use super::scheduler::Scheduler;

/// Outcome of routing one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Simple: a single agent handles it directly, no plan created.
    DelegateSimple,
    /// Uncertain: delegated to a single agent, but escalation is
    /// pre-authorized if that agent later finds it harder than expected.
    DelegateWithEscalation,
    /// Complex: decomposed into a plan and handed to the scheduler.
    Orchestrate { plan_id: uuid::Uuid, sub_task_count: usize },
    /// No worker matched the required role/skills; the issue is labeled
    /// `needs-coordination` and left for human triage.
    DelegateFailed,
}

/// Triages incoming issues and routes them to direct delegation or
/// full orchestration.
pub struct CoordinatorGateway {
    forge: Arc<dyn ForgePort>,
    planner: Arc<Planner>,
    scheduler: Arc<Scheduler>,
    llm: Option<Arc<dyn LlmPort>>,
    thresholds: ComplexityThresholds,
}

impl CoordinatorGateway {
    pub fn new(forge: Arc<dyn ForgePort>, planner: Arc<Planner>, scheduler: Arc<Scheduler>) -> Self {
        Self { forge, planner, scheduler, llm: None, thresholds: ComplexityThresholds::default() }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmPort>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Override the simple/complex score thresholds (spec.md §6's
    /// `complexity_thresholds` config surface) instead of the defaults.
    pub fn with_thresholds(mut self, thresholds: ComplexityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Route one issue. Always posts a single decision comment via
    /// [`ForgePort::comment_deduped`] before returning, even on the
    /// `DelegateFailed` path.
    pub async fn route(&self, issue: &Issue) -> CoreResult<RouteDecision> {
        let analysis = self.refine_complexity(issue).await;
        let repo = format!("{}/{}", issue.key.owner, issue.key.repo);

        let decision = match analysis.level {
            ComplexityLevel::Complex => self.orchestrate(issue).await?,
            ComplexityLevel::Simple | ComplexityLevel::Uncertain => self.delegate(analysis.level).await?,
        };

        let verb = match decision {
            RouteDecision::DelegateSimple => "delegate_simple",
            RouteDecision::DelegateWithEscalation => "delegate_with_escalation",
            RouteDecision::Orchestrate { .. } => "orchestrate",
            RouteDecision::DelegateFailed => "delegate_failed",
        };
        let comment = format!(
            "Coordinator decision for {}: route={verb}, complexity={:?} (score {}). {}",
            issue.key, analysis.level, analysis.score, analysis.reasoning
        );
        self.forge.comment_deduped(&repo, issue.key.number, &comment).await?;

        if decision == RouteDecision::DelegateFailed {
            self.forge
                .add_labels(&repo, issue.key.number, &["needs-coordination".to_string()])
                .await?;
        }

        Ok(decision)
    }

    /// Rule-based scoring, optionally refined by asking the LLM to
    /// confirm or override the bucket. Falls back to the rule-based
    /// result on any LLM failure or unparseable reply.
    async fn refine_complexity(&self, issue: &Issue) -> crate::domain::models::complexity::ComplexityAnalysis {
        let rule_based = complexity::analyze_issue_with_thresholds(issue, &self.thresholds);
        let Some(llm) = &self.llm else { return rule_based };

        let prompt = format!(
            "Classify this issue's implementation complexity as exactly one word: \
             simple, uncertain, or complex.\n\nTitle: {}\nBody:\n{}",
            issue.title, issue.body
        );
        let Ok(response) = llm.complete(CompletionRequest::new(prompt, "triage")).await else {
            return rule_based;
        };
        let normalized = response.trim().to_lowercase();
        let level = if normalized.contains("simple") {
            Some(ComplexityLevel::Simple)
        } else if normalized.contains("complex") {
            Some(ComplexityLevel::Complex)
        } else if normalized.contains("uncertain") {
            Some(ComplexityLevel::Uncertain)
        } else {
            None
        };

        match level {
            Some(level) => crate::domain::models::complexity::ComplexityAnalysis { level, ..rule_based },
            None => rule_based,
        }
    }

    async fn delegate(&self, level: ComplexityLevel) -> CoreResult<RouteDecision> {
        let available = self.scheduler.agent_count().await;
        if available == 0 {
            return Ok(RouteDecision::DelegateFailed);
        }
        Ok(match level {
            ComplexityLevel::Simple => RouteDecision::DelegateSimple,
            _ => RouteDecision::DelegateWithEscalation,
        })
    }

    async fn orchestrate(&self, issue: &Issue) -> CoreResult<RouteDecision> {
        let plan = self.planner.plan(issue).await?;
        let repo = format!("{}/{}", issue.key.owner, issue.key.repo);

        for task in &plan.tasks {
            let new_issue = NewIssue {
                title: task.title.clone(),
                body: task.description.clone(),
                labels: vec!["subtask".to_string()],
                assignees: vec![],
            };
            self.forge.create_issue(&repo, new_issue).await?;
        }

        let plan_id = plan.plan_id;
        let sub_task_count = plan.tasks.len();
        self.scheduler.add_plan(plan).await;

        Ok(RouteDecision::Orchestrate { plan_id, sub_task_count })
    }
}

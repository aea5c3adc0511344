//! Escalation orchestration (C10).
//!
//! [`crate::domain::escalation::escalation_reasons`] decides *whether*
//! to escalate; this module does the side-effecting part once that
//! decision is positive: post an idempotent comment, hand the issue
//! back to the coordinator if one is wired in, or label it
//! `needs-coordination` and tell the caller to abort if not.

use std::sync::Arc;

use crate::domain::errors::CoreResult;
use crate::domain::escalation;
use crate::domain::models::escalation::{EscalationContext, EscalationNextAction, EscalationResult};
use crate::domain::models::issue::Issue;
use crate::domain::ports::forge::ForgePort;

use super::coordinator_gateway::{CoordinatorGateway, RouteDecision};

pub struct Escalator {
    forge: Arc<dyn ForgePort>,
    coordinator: Option<Arc<CoordinatorGateway>>,
}

impl Escalator {
    pub fn new(forge: Arc<dyn ForgePort>, coordinator: Option<Arc<CoordinatorGateway>>) -> Self {
        Self { forge, coordinator }
    }

    /// Evaluate `context` and, if any trigger fired, escalate `issue`.
    pub async fn evaluate(&self, issue: &Issue, context: &EscalationContext) -> CoreResult<EscalationResult> {
        let reasons = escalation::escalation_reasons(context);
        if reasons.is_empty() {
            return Ok(EscalationResult {
                escalated: false,
                coordinator_plan_id: None,
                sub_issues_created: vec![],
                message: "no escalation trigger fired".to_string(),
                next_action: EscalationNextAction::Continue,
            });
        }

        let repo = format!("{}/{}", issue.key.owner, issue.key.repo);
        let message = format!("Escalating {}: {}", issue.key, reasons.join("; "));
        self.forge.comment_deduped(&repo, issue.key.number, &message).await?;

        match &self.coordinator {
            Some(coordinator) => {
                let decision = coordinator.route(issue).await?;
                let coordinator_plan_id = match decision {
                    RouteDecision::Orchestrate { plan_id, .. } => Some(plan_id.to_string()),
                    _ => None,
                };
                Ok(EscalationResult {
                    escalated: true,
                    coordinator_plan_id,
                    sub_issues_created: vec![],
                    message,
                    next_action: EscalationNextAction::WaitForCoordinator,
                })
            }
            None => {
                self.forge
                    .add_labels(&repo, issue.key.number, &["needs-coordination".to_string()])
                    .await?;
                Ok(EscalationResult {
                    escalated: true,
                    coordinator_plan_id: None,
                    sub_issues_created: vec![],
                    message,
                    next_action: EscalationNextAction::Abort,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::forge::mock::MockForgeClient;
    use crate::application::planner::Planner;
    use crate::application::scheduler::Scheduler;
    use crate::domain::models::agent::{AgentCapability, AgentRole};
    use crate::domain::models::config::PlannerConfig;
    use crate::domain::models::issue::IssueKey;
    use chrono::Utc;

    fn issue() -> Issue {
        Issue {
            key: IssueKey { owner: "o".into(), repo: "r".into(), number: 9 },
            title: "Stuck task".into(),
            body: "body".into(),
            labels: Default::default(),
            assignees: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn no_trigger_returns_continue_without_touching_the_forge() {
        let forge = Arc::new(MockForgeClient::new());
        let escalator = Escalator::new(forge.clone(), None);
        let result = escalator.evaluate(&issue(), &EscalationContext::default()).await.unwrap();
        assert!(!result.escalated);
        assert_eq!(result.next_action, EscalationNextAction::Continue);
        assert!(forge.calls().is_empty());
    }

    #[tokio::test]
    async fn no_coordinator_wired_labels_the_issue_and_aborts() {
        let forge = Arc::new(MockForgeClient::new());
        let escalator = Escalator::new(forge.clone(), None);
        let context = EscalationContext { files_affected: 10, ..Default::default() };
        let result = escalator.evaluate(&issue(), &context).await.unwrap();
        assert!(result.escalated);
        assert_eq!(result.next_action, EscalationNextAction::Abort);
        assert!(forge
            .calls()
            .into_iter()
            .any(|c| matches!(c, crate::adapters::forge::mock::RecordedCall::AddLabels { labels, .. } if labels.contains(&"needs-coordination".to_string()))));
    }

    #[tokio::test]
    async fn coordinator_present_waits_for_it() {
        let forge = Arc::new(MockForgeClient::new());
        let scheduler = Arc::new(Scheduler::new());
        scheduler.register_agent(AgentCapability::new("a1", AgentRole::Developer)).await;
        let planner = Arc::new(Planner::new(PlannerConfig::default()));
        let coordinator = Arc::new(CoordinatorGateway::new(forge.clone(), planner, scheduler));
        let escalator = Escalator::new(forge, Some(coordinator));

        let context = EscalationContext { is_stuck: true, blocker_description: Some("missing creds".into()), ..Default::default() };
        let result = escalator.evaluate(&issue(), &context).await.unwrap();
        assert!(result.escalated);
        assert_eq!(result.next_action, EscalationNextAction::WaitForCoordinator);
    }
}

//! Process-wide application state.
//!
//! Built once in `main`, wrapped in `Arc`, and passed to every CLI
//! command — no global singletons anywhere (SPEC_FULL.md §9's resolved
//! open question), the same shape as the teacher's own service-layer
//! composition root in its `main.rs`.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::forge::github::GitHubForgeClient;
use crate::adapters::llm::http::HttpLlmClient;
use crate::adapters::sqlite::{self, SqliteAgentRepository, SqlitePlanRepository};
use crate::application::{CoordinatorGateway, Escalator, Planner, PrWorkflow, ReviewEngine, Scheduler};
use crate::domain::models::config::AppConfig;
use crate::domain::ports::{AgentRepository, ForgePort, LlmPort, PlanRepository};
use crate::infrastructure::logging::AuditLogger;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::infrastructure::sandbox::ShellSandbox;

/// Every component a CLI command might need, constructed once at
/// startup and shared by reference from then on.
pub struct AppState {
    pub config: AppConfig,
    pub forge: Arc<dyn ForgePort>,
    pub rate_limiter: Arc<RateLimiter>,
    pub sandbox: Arc<ShellSandbox>,
    pub plan_repository: Arc<dyn PlanRepository>,
    pub agent_repository: Arc<dyn AgentRepository>,
    pub scheduler: Arc<Scheduler>,
    pub planner: Arc<Planner>,
    pub coordinator_gateway: Arc<CoordinatorGateway>,
    pub escalator: Arc<Escalator>,
    pub review_engine: Arc<ReviewEngine>,
    pub pr_workflow: Arc<PrWorkflow>,
    pub audit_logger: Arc<AuditLogger>,
}

impl AppState {
    /// Wire every component from `config` and the process environment.
    /// `GITHUB_TOKEN` selects the real forge adapter; without it every
    /// forge call fails with `CoreError::AuthError` rather than the
    /// process refusing to start, so read-only commands (`plan show`,
    /// `rate-limit stats`) still work against persisted state.
    pub async fn bootstrap(config: AppConfig, database_url: &str) -> Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));

        let forge: Arc<dyn ForgePort> = Arc::new(
            GitHubForgeClient::from_env(rate_limiter.clone())
                .unwrap_or_else(|_| GitHubForgeClient::new(String::new(), rate_limiter.clone())),
        );

        let llm: Option<Arc<dyn LlmPort>> = if config.review_merge.use_llm {
            std::env::var("ANTHROPIC_API_KEY").ok().map(|key| Arc::new(HttpLlmClient::new(key)) as Arc<dyn LlmPort>)
        } else {
            None
        };

        let sandbox = Arc::new(ShellSandbox::new(crate::infrastructure::sandbox::SandboxConfig::from_settings(&config.sandbox)));

        let pool = sqlite::create_pool(database_url, None).await.context("failed to open swarmctl database")?;
        sqlite::migrations::run(&pool).await.context("failed to run database migrations")?;
        let plan_repository: Arc<dyn PlanRepository> = Arc::new(SqlitePlanRepository::new(pool.clone()));
        let agent_repository: Arc<dyn AgentRepository> = Arc::new(SqliteAgentRepository::new(pool));

        let scheduler = Arc::new(Scheduler::new());
        for agent in agent_repository.list_agents().await.context("failed to load agents")? {
            scheduler.register_agent(agent).await;
        }
        for plan in plan_repository.list_plans().await.context("failed to load plans")? {
            scheduler.add_plan(plan).await;
        }

        let planner = Arc::new(match &llm {
            Some(llm) => Planner::with_llm(config.planner.clone(), llm.clone()),
            None => Planner::new(config.planner.clone()),
        });

        let coordinator_gateway = {
            let mut gateway = CoordinatorGateway::new(forge.clone(), planner.clone(), scheduler.clone())
                .with_thresholds(config.complexity_thresholds);
            if let Some(llm) = &llm {
                gateway = gateway.with_llm(llm.clone());
            }
            Arc::new(gateway)
        };

        let escalator = Arc::new(Escalator::new(forge.clone(), Some(coordinator_gateway.clone())));

        let review_engine = {
            let mut engine = ReviewEngine::new(sandbox.clone(), config.review_merge.clone());
            if let Some(llm) = &llm {
                engine = engine.with_llm(llm.clone());
            }
            Arc::new(engine)
        };

        let pr_workflow = Arc::new(PrWorkflow::new(
            forge.clone(),
            review_engine.clone(),
            config.review_merge.clone(),
            config.review_merge.reviewer_identity.clone(),
        ));

        let audit_logger = Arc::new(AuditLogger::new(&config.logging.audit_log_path).await.context("failed to open audit log")?);

        Ok(Self {
            config,
            forge,
            rate_limiter,
            sandbox,
            plan_repository,
            agent_repository,
            scheduler,
            planner,
            coordinator_gateway,
            escalator,
            review_engine,
            pr_workflow,
            audit_logger,
        })
    }
}

//! Trait ports separating the domain/application layers from the
//! concrete forge, LLM, and persistence adapters.

pub mod agent_repository;
pub mod forge;
pub mod llm;
pub mod plan_repository;

pub use agent_repository::AgentRepository;
pub use forge::{ForgePort, IssueListFilter, MergeMethod, NewIssue, Permission, PrFile, PullRequest};
pub use llm::{CompletionRequest, LlmPort};
pub use plan_repository::PlanRepository;

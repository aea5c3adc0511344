//! SQLite-backed persistence: pooled connections, embedded migrations,
//! and the queryable [`PlanRepository`](crate::domain::ports::plan_repository::PlanRepository)
//! and [`AgentRepository`](crate::domain::ports::agent_repository::AgentRepository)
//! adapters used when operators want durable history instead of
//! [`crate::adapters::fs::JsonPlanStore`]'s flat files.

pub mod agent_repository;
pub mod connection;
pub mod migrations;
pub mod plan_repository;

pub use agent_repository::SqliteAgentRepository;
pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use plan_repository::SqlitePlanRepository;

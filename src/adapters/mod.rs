//! Adapters layer: concrete implementations of the domain's ports
//! ([`crate::domain::ports::forge::ForgePort`],
//! [`crate::domain::ports::llm::LlmPort`],
//! [`crate::domain::ports::plan_repository::PlanRepository`]). Nothing
//! above this layer knows which forge, LLM provider, or storage backend
//! is actually wired in.

pub mod forge;
pub mod fs;
pub mod llm;
pub mod sqlite;

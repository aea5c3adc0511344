//! LLM adapters: the concrete implementations of
//! [`crate::domain::ports::llm::LlmPort`].

pub mod http;
pub mod mock;

pub use http::HttpLlmClient;
pub use mock::MockLlmClient;

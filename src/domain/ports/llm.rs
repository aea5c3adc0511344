//! LLM provider port.
//!
//! A single `complete` operation per spec.md §6. Credentials and model
//! identity are config-selected; the core never knows which provider is
//! behind this trait. Failures are surfaced as [`crate::domain::errors::CoreError::LlmError`]
//! and callers (ComplexityAnalyzer's LLM-assisted variant, Planner's LLM
//! merge, ReviewEngine's critique pass) downgrade to rule-based behavior
//! rather than propagate further.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::CoreResult;

/// Parameters for one completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout: Duration::from_secs(300),
        }
    }
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> CoreResult<String>;
}

//! Scripted [`LlmPort`] double, grounded in the teacher's
//! `adapters::substrates::mock` fixture style: queue canned responses,
//! or fall back to an echo, and record every prompt seen.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ports::llm::{CompletionRequest, LlmPort};

#[derive(Default)]
struct Fixture {
    queued_responses: Vec<Result<String, String>>,
    prompts_seen: Vec<String>,
}

/// Test double for [`LlmPort`]. Responses are consumed in FIFO order;
/// once exhausted, `complete` echoes the prompt back so tests that
/// don't care about the exact completion still get a deterministic,
/// non-empty string.
pub struct MockLlmClient {
    state: Mutex<Fixture>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self { state: Mutex::new(Fixture::default()) }
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&self, response: impl Into<String>) {
        self.state.lock().unwrap().queued_responses.push(Ok(response.into()));
    }

    pub fn queue_error(&self, message: impl Into<String>) {
        self.state.lock().unwrap().queued_responses.push(Err(message.into()));
    }

    pub fn prompts_seen(&self) -> Vec<String> {
        self.state.lock().unwrap().prompts_seen.clone()
    }
}

#[async_trait]
impl LlmPort for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> CoreResult<String> {
        let mut state = self.state.lock().unwrap();
        state.prompts_seen.push(request.prompt.clone());
        if state.queued_responses.is_empty() {
            return Ok(format!("echo: {}", request.prompt));
        }
        match state.queued_responses.remove(0) {
            Ok(text) => Ok(text),
            Err(message) => Err(CoreError::LlmError(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_responses_are_consumed_in_order() {
        let llm = MockLlmClient::new();
        llm.queue_response("first");
        llm.queue_response("second");

        let first = llm.complete(CompletionRequest::new("p1", "m")).await.unwrap();
        let second = llm.complete(CompletionRequest::new("p2", "m")).await.unwrap();
        assert_eq!(first, "first");
        assert_eq!(second, "second");
        assert_eq!(llm.prompts_seen(), vec!["p1".to_string(), "p2".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_echo_once_queue_is_empty() {
        let llm = MockLlmClient::new();
        let result = llm.complete(CompletionRequest::new("hello", "m")).await.unwrap();
        assert_eq!(result, "echo: hello");
    }

    #[tokio::test]
    async fn queued_error_surfaces_as_llm_error() {
        let llm = MockLlmClient::new();
        llm.queue_error("provider down");
        let result = llm.complete(CompletionRequest::new("p", "m")).await;
        assert!(matches!(result, Err(CoreError::LlmError(_))));
    }
}

//! HTTP-backed [`LlmPort`] implementation, grounded in the teacher's
//! `infrastructure::claude::client::ClaudeClientImpl`: pooled
//! `reqwest::Client`, a bearer credential, and the same request/retry
//! shape, adapted to the narrower single-`complete` port this crate's
//! orchestrators depend on.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CoreError;
use crate::domain::errors::CoreResult;
use crate::domain::ports::llm::{CompletionRequest, LlmPort};
use crate::infrastructure::retry::RetryPolicy;

const ANTHROPIC_API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

/// Talks to an Anthropic-compatible `/v1/messages` endpoint. The base
/// URL is configurable so the same client works against a self-hosted
/// gateway that mirrors the wire format.
pub struct HttpLlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpLlmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .pool_max_idle_per_host(10)
                .build()
                .expect("reqwest client configuration is static and always valid"),
            api_key,
            base_url,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> CoreResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| CoreError::AuthError("ANTHROPIC_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    async fn send(&self, request: &CompletionRequest) -> CoreResult<String> {
        let body = AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![AnthropicMessage { role: "user", content: request.prompt.clone() }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(CoreError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                CoreError::AuthError(body)
            } else {
                CoreError::PlatformError(format!("{status}: {body}"))
            });
        }

        let parsed: AnthropicResponse = response.json().await.map_err(CoreError::from)?;
        Ok(parsed.content.into_iter().map(|block| block.text).collect::<Vec<_>>().join(""))
    }
}

#[async_trait]
impl LlmPort for HttpLlmClient {
    async fn complete(&self, request: CompletionRequest) -> CoreResult<String> {
        self.retry
            .retry_idempotent(|| self.send(&request))
            .await
            .map_err(|err| CoreError::LlmError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_default_base_url() {
        let client = HttpLlmClient::new("sk-test".to_string());
        assert_eq!(client.base_url, "https://api.anthropic.com");
    }
}

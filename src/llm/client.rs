//! Hosted model client.
//!
//! The [`ModelClient`] trait is the system's only I/O boundary to an
//! external service; everything else in the pipeline is deterministic and
//! tests substitute a stub here. [`HttpModelClient`] talks to OpenAI,
//! Anthropic, or Gemini (via its OpenAI-compatible endpoint), with the
//! provider inferred from the model name.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::types::{PipelineError, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Completion endpoint seam: prompt in, raw text out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the prompts to the hosted endpoint and return the raw completion.
    ///
    /// # Errors
    ///
    /// `ModelUnavailable` on transport/auth/HTTP failure, `ModelTimeout`
    /// when the configured wait bound is exceeded.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Hosted model provider, inferred from the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
}

impl Provider {
    /// Infer the provider from a model name.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") || model.starts_with("anthropic") {
            Provider::Anthropic
        } else if model.starts_with("gemini") {
            Provider::Gemini
        } else {
            Provider::OpenAI
        }
    }
}

/// OpenAI-compatible chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Anthropic Messages API response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

/// HTTP client for hosted completion endpoints.
pub struct HttpModelClient {
    api_key: String,
    model: String,
    provider: Provider,
    client: Client,
}

impl HttpModelClient {
    /// Create a new client with a request timeout.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let provider = Provider::for_model(&model);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            PipelineError::ModelUnavailable(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self {
            api_key,
            model,
            provider,
            client,
        })
    }

    /// Create a client from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.api_key.clone(), config.model.clone(), config.timeout)
    }

    fn transport_error(e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::ModelTimeout(e.to_string())
        } else {
            PipelineError::ModelUnavailable(e.to_string())
        }
    }

    /// Call an OpenAI-compatible chat completions endpoint.
    async fn call_chat_completions(
        &self,
        url: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": 0.0
            }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ModelUnavailable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::ModelUnavailable(format!(
                "completion endpoint error {status}: {body}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            PipelineError::ModelUnavailable(format!("failed to parse completion response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                PipelineError::ModelUnavailable("empty completion response".to_string())
            })
    }

    /// Call the Anthropic Messages API.
    async fn call_anthropic(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "max_tokens": 1024,
                "system": system_prompt,
                "messages": [
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": 0.0
            }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ModelUnavailable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::ModelUnavailable(format!(
                "completion endpoint error {status}: {body}"
            )));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            PipelineError::ModelUnavailable(format!("failed to parse completion response: {e}"))
        })?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| {
                PipelineError::ModelUnavailable("empty completion response".to_string())
            })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.model, provider = ?self.provider, "sending completion request");
        match self.provider {
            Provider::OpenAI => {
                self.call_chat_completions(OPENAI_URL, system_prompt, user_prompt)
                    .await
            }
            Provider::Gemini => {
                self.call_chat_completions(GEMINI_URL, system_prompt, user_prompt)
                    .await
            }
            Provider::Anthropic => self.call_anthropic(system_prompt, user_prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_inference() {
        assert_eq!(Provider::for_model("gpt-4o-mini"), Provider::OpenAI);
        assert_eq!(Provider::for_model("claude-sonnet-4-5"), Provider::Anthropic);
        assert_eq!(Provider::for_model("gemini-2.5-flash"), Provider::Gemini);
        assert_eq!(Provider::for_model("o3-mini"), Provider::OpenAI);
    }
}

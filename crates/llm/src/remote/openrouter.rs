//! OpenRouter client implementation.
//!
//! OpenRouter routes requests to many providers behind a single
//! OpenAI-compatible `/chat/completions` endpoint, so this client reuses
//! that same request/response shape with OpenRouter's own base URL and
//! auth header.
//!
//! # Example
//!
//! ```rust,ignore
//! use intent_llm::config::{LlmConfig, Provider};
//! use intent_llm::remote::OpenRouterClient;
//! use intent_graph_core::LLMClient;
//!
//! let config = LlmConfig::new(Provider::Openrouter, "anthropic/claude-3-opus")
//!     .with_api_key_from_env("OPENROUTER_API_KEY")?;
//! let client = OpenRouterClient::new(config);
//! let response = client.generate("What is Rust?", None).await?;
//! ```

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::shared::{status_to_error, ProviderBase};
use async_trait::async_trait;
use intent_graph_core::error::Result as GraphResult;
use intent_graph_core::{LLMClient, RawLlmResponse};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter API client.
#[derive(Clone)]
pub struct OpenRouterClient {
    config: LlmConfig,
    client: Client,
    base: ProviderBase,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build reqwest client");
        Self {
            config,
            client,
            base: ProviderBase::new(),
        }
    }

    pub fn with_base(mut self, base: ProviderBase) -> Self {
        self.base = base;
        self
    }

    fn base_url(&self) -> String {
        self.config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

#[async_trait]
impl LLMClient for OpenRouterClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> GraphResult<RawLlmResponse> {
        self.config.validate()?;
        let model = model.unwrap_or(&self.config.model).to_string();
        let url = format!("{}/chat/completions", self.base_url());

        let body = OpenRouterRequest {
            model: model.clone(),
            messages: vec![OpenRouterMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, text).into());
        }

        let parsed: OpenRouterResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(self.base.record(
            prompt,
            "openrouter",
            &model,
            content,
            parsed.usage.as_ref().map(|u| u.prompt_tokens),
            parsed.usage.as_ref().map(|u| u.completion_tokens),
            started.elapsed(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<OpenRouterMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenRouterMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
}

#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    #[test]
    fn defaults_base_url_when_unset() {
        let config = LlmConfig::new(Provider::Openrouter, "anthropic/claude-3-opus").with_api_key("sk-test");
        let client = OpenRouterClient::new(config);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }
}

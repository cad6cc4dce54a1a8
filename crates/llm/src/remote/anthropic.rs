//! Anthropic Claude client implementation.
//!
//! One-shot text generation against the `/v1/messages` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use intent_llm::config::{LlmConfig, Provider};
//! use intent_llm::remote::AnthropicClient;
//! use intent_graph_core::LLMClient;
//!
//! let config = LlmConfig::new(Provider::Anthropic, "claude-3-5-sonnet-20241022")
//!     .with_api_key_from_env("ANTHROPIC_API_KEY")?;
//! let client = AnthropicClient::new(config);
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

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 4096;

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct AnthropicClient {
    config: LlmConfig,
    client: Client,
    base: ProviderBase,
}

impl AnthropicClient {
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
impl LLMClient for AnthropicClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> GraphResult<RawLlmResponse> {
        self.config.validate()?;
        let model = model.unwrap_or(&self.config.model).to_string();
        let url = format!("{}/v1/messages", self.base_url());

        let body = ClaudeRequest {
            model: model.clone(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: false,
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, text).into());
        }

        let parsed: ClaudeResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(self.base.record(
            prompt,
            "anthropic",
            &model,
            content,
            Some(parsed.usage.input_tokens),
            Some(parsed.usage.output_tokens),
            started.elapsed(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    max_tokens: usize,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    #[test]
    fn defaults_base_url_when_unset() {
        let config = LlmConfig::new(Provider::Anthropic, "claude-3-5-sonnet-20241022").with_api_key("sk-test");
        let client = AnthropicClient::new(config);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }
}

//! OpenAI client implementation.
//!
//! One-shot text generation against the `/chat/completions` endpoint —
//! GPT-4/4o/3.5-Turbo and the `o1` reasoning family all speak this same
//! wire format. Multi-turn chat, tool calls, and streaming are out of this
//! spec's scope (§4.8); the engine only ever needs one prompt in, one reply
//! out.
//!
//! # Example
//!
//! ```rust,ignore
//! use intent_llm::config::{LlmConfig, Provider};
//! use intent_llm::remote::OpenAiClient;
//! use intent_graph_core::LLMClient;
//!
//! let config = LlmConfig::new(Provider::Openai, "gpt-4o").with_api_key_from_env("OPENAI_API_KEY")?;
//! let client = OpenAiClient::new(config);
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

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: LlmConfig,
    client: Client,
    base: ProviderBase,
}

impl OpenAiClient {
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
impl LLMClient for OpenAiClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> GraphResult<RawLlmResponse> {
        self.config.validate()?;
        let model = model.unwrap_or(&self.config.model).to_string();
        let url = format!("{}/chat/completions", self.base_url());

        let body = OpenAiRequest {
            model: model.clone(),
            messages: vec![OpenAiMessage {
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

        let parsed: OpenAiResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(self.base.record(
            prompt,
            "openai",
            &model,
            content,
            parsed.usage.as_ref().map(|u| u.prompt_tokens),
            parsed.usage.as_ref().map(|u| u.completion_tokens),
            started.elapsed(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    #[test]
    fn defaults_base_url_when_unset() {
        let config = LlmConfig::new(Provider::Openai, "gpt-4o").with_api_key("sk-test");
        let client = OpenAiClient::new(config);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn honors_configured_base_url() {
        let config = LlmConfig::new(Provider::Openai, "gpt-4o")
            .with_api_key("sk-test")
            .with_base_url("https://example.test/v1");
        let client = OpenAiClient::new(config);
        assert_eq!(client.base_url(), "https://example.test/v1");
    }
}

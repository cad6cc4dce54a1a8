//! Google Gemini client implementation.
//!
//! One-shot text generation against the `generateContent` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use intent_llm::config::{LlmConfig, Provider};
//! use intent_llm::remote::GoogleClient;
//! use intent_graph_core::LLMClient;
//!
//! let config = LlmConfig::new(Provider::Google, "gemini-1.5-pro").with_api_key_from_env("GOOGLE_API_KEY")?;
//! let client = GoogleClient::new(config);
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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API client.
#[derive(Clone)]
pub struct GoogleClient {
    config: LlmConfig,
    client: Client,
    base: ProviderBase,
}

impl GoogleClient {
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
impl LLMClient for GoogleClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> GraphResult<RawLlmResponse> {
        self.config.validate()?;
        let model = model.unwrap_or(&self.config.model).to_string();
        let url = format!("{}/models/{}:generateContent", self.base_url(), model);

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_deref().unwrap_or_default())])
            .json(&body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, text).into());
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        Ok(self.base.record(
            prompt,
            "google",
            &model,
            content,
            parsed.usage_metadata.as_ref().map(|u| u.prompt_token_count),
            parsed.usage_metadata.as_ref().map(|u| u.candidates_token_count),
            started.elapsed(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    #[test]
    fn defaults_base_url_when_unset() {
        let config = LlmConfig::new(Provider::Google, "gemini-1.5-pro").with_api_key("key");
        let client = GoogleClient::new(config);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }
}

//! Ollama client implementation.
//!
//! Talks to a local Ollama server's `/api/chat` endpoint. No `api_key` is
//! required; `base_url` defaults to `http://localhost:11434` via
//! [`LlmConfig::resolved_base_url`].
//!
//! # Example
//!
//! ```rust,ignore
//! use intent_llm::config::{LlmConfig, Provider};
//! use intent_llm::local::OllamaClient;
//! use intent_graph_core::LLMClient;
//!
//! let config = LlmConfig::new(Provider::Ollama, "llama3");
//! let client = OllamaClient::new(config);
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

/// Ollama client for local LLM inference.
#[derive(Clone)]
pub struct OllamaClient {
    config: LlmConfig,
    client: Client,
    base: ProviderBase,
}

impl OllamaClient {
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
        self.config
            .resolved_base_url()
            .expect("ollama always resolves a base_url")
    }

    /// Probe `/api/tags`; returns `false` on any connection failure rather
    /// than surfacing an error, since this is a best-effort liveness check.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url());
        matches!(self.client.get(&url).send().await, Ok(resp) if resp.status().is_success())
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> GraphResult<RawLlmResponse> {
        self.config.validate()?;
        let model = model.unwrap_or(&self.config.model).to_string();
        let url = format!("{}/api/chat", self.base_url());

        let body = OllamaRequest {
            model: model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, text).into());
        }

        let parsed: OllamaResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.base.record(
            prompt,
            "ollama",
            &model,
            parsed.message.content,
            parsed.prompt_eval_count,
            parsed.eval_count,
            started.elapsed(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    #[test]
    fn defaults_base_url_to_localhost() {
        let config = LlmConfig::new(Provider::Ollama, "llama3");
        let client = OllamaClient::new(config);
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn validate_does_not_require_api_key() {
        let config = LlmConfig::new(Provider::Ollama, "llama3");
        assert!(config.validate().is_ok());
    }
}

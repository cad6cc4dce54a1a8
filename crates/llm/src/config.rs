//! `LlmConfig` — the provider-dispatch object the engine treats as opaque.
//!
//! Round-trips through `GraphNode.config` and
//! `IntentDAG.metadata["default_llm_config"]` as plain JSON (§6), so every
//! field here must stay `Serialize`/`Deserialize`.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// One of the providers `intent-llm` ships a client for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Anthropic,
    Google,
    Openrouter,
    Ollama,
}

impl Provider {
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    3
}

/// The LLM config object per §6: `{provider, api_key, model, base_url}`.
/// Every provider except `ollama` requires `api_key`; `ollama` requires
/// neither `api_key` nor `base_url`, defaulting the latter to
/// `http://localhost:11434`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl LlmConfig {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: None,
            model: model.into(),
            base_url: None,
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Read the API key from an environment variable, failing with
    /// [`LlmError::ApiKeyNotFound`] if unset — the same failure a missing
    /// `api_key` on a non-ollama provider produces at request time.
    pub fn with_api_key_from_env(mut self, env_var: &str) -> Result<Self> {
        let key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("environment variable: {env_var}")))?;
        self.api_key = Some(key);
        Ok(self)
    }

    /// The base URL to dial, falling back to the ollama default when unset
    /// and the provider is ollama.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url.clone().or_else(|| {
            matches!(self.provider, Provider::Ollama).then(|| OLLAMA_DEFAULT_BASE_URL.to_string())
        })
    }

    /// Validate the `api_key` requirement per provider before dispatching a request.
    pub fn validate(&self) -> Result<()> {
        if self.provider.requires_api_key() && self.api_key.is_none() {
            return Err(LlmError::ApiKeyNotFound(format!(
                "provider {:?} requires api_key",
                self.provider
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_defaults_base_url_when_unset() {
        let config = LlmConfig::new(Provider::Ollama, "llama3");
        assert_eq!(config.resolved_base_url(), Some(OLLAMA_DEFAULT_BASE_URL.to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn remote_provider_requires_api_key() {
        let config = LlmConfig::new(Provider::Openai, "gpt-4o");
        assert!(config.validate().is_err());
        let config = config.with_api_key("sk-test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_methods_set_timeout_and_retries() {
        let config = LlmConfig::new(Provider::Anthropic, "claude-3")
            .with_api_key("key")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
    }
}

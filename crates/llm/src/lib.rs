//! # intent-llm — pluggable LLM client abstraction
//!
//! One concrete [`intent_graph_core::LLMClient`] implementation per
//! provider, each a thin `reqwest`-based HTTP client, plus a
//! [`pricing::CostCalculator`] and an in-memory [`audit::AuditLog`] shared
//! across providers. Classifier and extractor nodes in `intent-graph-core`
//! call into whichever client a host constructs and injects into
//! [`intent_graph_core::Context`] under `llm_service` — this crate never
//! invents its own execution contract; it only satisfies the one the core
//! crate defines.
//!
//! # Local providers
//!
//! - **Ollama** — connects to a local Ollama server (defaults to
//!   `http://localhost:11434`).
//!
//! # Remote providers
//!
//! - **OpenAI**, **Anthropic** (Claude), **Google** (Gemini), **OpenRouter**.
//!
//! # Example
//!
//! ```rust,no_run
//! use intent_llm::config::{LlmConfig, Provider};
//! use intent_llm::remote::OpenAiClient;
//! use intent_graph_core::LLMClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::new(Provider::Openai, "gpt-4o").with_api_key_from_env("OPENAI_API_KEY")?;
//! let client = OpenAiClient::new(config);
//! let response = client.generate("What is Rust?", None).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod pricing;
pub mod shared;

#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "remote")]
pub mod remote;

pub use audit::{AuditEntry, AuditLog};
pub use config::{LlmConfig, Provider};
pub use error::{LlmError, Result};
pub use pricing::{CostCalculator, ModelPricing, PricingConfig, TablePricing};

pub use intent_graph_core::{LLMClient, RawLlmResponse};

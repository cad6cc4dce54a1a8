//! Remote LLM provider implementations — cloud-hosted APIs requiring an API key.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod openrouter;

pub use anthropic::AnthropicClient;
pub use google::GoogleClient;
pub use openai::OpenAiClient;
pub use openrouter::OpenRouterClient;

//! Local LLM provider implementations — LLMs running on localhost, no API key required.

pub mod ollama;

pub use ollama::OllamaClient;

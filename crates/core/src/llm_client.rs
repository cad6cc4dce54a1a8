//! The `LLMClient` capability classifier and extractor nodes call into.
//!
//! Defined here (rather than in `intent-llm`) so this crate never depends on
//! a concrete provider implementation — `intent-llm`'s clients implement
//! this trait and depend on this crate for it, not the other way around.
//! See the classifier/extractor execution contracts in
//! [`crate::nodes::classifier`] and [`crate::nodes::extractor`].

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// One LLM call's result, provider-agnostic.
#[derive(Debug, Clone)]
pub struct RawLlmResponse {
    pub content: String,
    pub model: String,
    pub provider: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost: Option<f64>,
    pub duration: Option<std::time::Duration>,
    pub metadata: HashMap<String, Value>,
}

/// A pluggable LLM backend. One implementation per provider lives in
/// `intent-llm`; classifier and extractor nodes call `generate` through a
/// trait object stored on [`crate::context::Context`], never a concrete type.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<RawLlmResponse>;
}

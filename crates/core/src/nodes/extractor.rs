//! Extractor node: fills a typed parameter schema from the input via an LLM.
//!
//! Reply parsing tries, in order: a fenced ` ```json ` block, a fenced
//! ` ```yaml ` block, a bare ` ``` ` fenced block, bare JSON, then YAML —
//! the three-step fence-unwrap-then-parse order `intent_kit`'s
//! `StructuredLLMResponse` uses upstream of this spec's one-line summary. If
//! the schema has exactly one string-typed field, a reply that still fails
//! every structured parse is assigned verbatim to that field.

use crate::context::{Context, ContextPatch};
use crate::error::{GraphError, Result};
use crate::graph::GraphNode;
use crate::node_types::{ExecutionResult, NodeImpl};
use crate::param_schema::{coerce_all, ParamType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn default_output_key() -> String {
    "extracted_params".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    pub param_schema: BTreeMap<String, ParamType>,
    #[serde(default = "default_output_key")]
    pub output_key: String,
    #[serde(default)]
    pub llm_config: Option<Value>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

pub struct ExtractorNode {
    config: ExtractorConfig,
}

impl ExtractorNode {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    fn build_prompt(&self, input: &str) -> String {
        match &self.config.custom_prompt {
            Some(template) => template.replace("{user_input}", input),
            None => {
                let fields: Vec<String> = self
                    .config
                    .param_schema
                    .keys()
                    .map(|k| format!("\"{k}\""))
                    .collect();
                format!(
                    "Extract the following fields as a single JSON object: {}.\n\nInput: {input}\n\nJSON:",
                    fields.join(", ")
                )
            }
        }
    }

    /// Strip a fenced ```json, ```yaml, or bare ``` block from `reply`, if
    /// present, returning the inner text.
    fn unwrap_fence(reply: &str) -> &str {
        let trimmed = reply.trim();
        for fence in ["```json", "```yaml", "```"] {
            if let Some(rest) = trimmed.strip_prefix(fence) {
                let rest = rest.strip_prefix('\n').unwrap_or(rest);
                if let Some(end) = rest.rfind("```") {
                    return rest[..end].trim();
                }
                return rest.trim();
            }
        }
        trimmed
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        let unwrapped = Self::unwrap_fence(reply);

        if let Ok(v) = serde_json::from_str::<Value>(unwrapped) {
            return Ok(v);
        }
        if let Ok(v) = serde_yaml::from_str::<Value>(unwrapped) {
            return Ok(v);
        }
        if self.config.param_schema.len() == 1 {
            if let Some((name, ParamType::String)) = self.config.param_schema.iter().next() {
                let mut obj = serde_json::Map::new();
                obj.insert(name.clone(), Value::String(unwrapped.to_string()));
                return Ok(Value::Object(obj));
            }
        }
        Err(GraphError::Extraction {
            node: String::new(),
            reason: "reply is neither valid JSON, YAML, nor a bare string for a single-string-field schema"
                .to_string(),
        })
    }
}

#[async_trait]
impl NodeImpl for ExtractorNode {
    async fn execute(&self, node: &GraphNode, input: &Value, ctx: &mut Context) -> Result<ExecutionResult> {
        let input_str = input.as_str().map(str::to_string).unwrap_or_else(|| input.to_string());

        let llm_service = ctx.llm_service().cloned().ok_or_else(|| GraphError::Extraction {
            node: node.id.clone(),
            reason: "no llm_service set in context".to_string(),
        })?;
        let llm_config = self
            .config
            .llm_config
            .clone()
            .or_else(|| ctx.get("system.default_llm_config").cloned());
        let model = llm_config.as_ref().and_then(|c| c.get("model")).and_then(Value::as_str);

        let prompt = self.build_prompt(&input_str);
        let response = llm_service
            .generate(&prompt, model)
            .await
            .map_err(|e| GraphError::Extraction {
                node: node.id.clone(),
                reason: e.to_string(),
            })?;

        let parsed = self.parse_reply(&response.content).map_err(|e| match e {
            GraphError::Extraction { reason, .. } => GraphError::Extraction {
                node: node.id.clone(),
                reason,
            },
            other => other,
        })?;

        let coerced = coerce_all(&self.config.param_schema, &parsed)?;

        let patch = ContextPatch::new(node.id.clone())
            .with(self.config.output_key.clone(), Value::Object(coerced.clone()));

        Ok(ExecutionResult::new()
            .with_data(Value::Object(coerced))
            .with_next_edges(vec!["success".to_string()])
            .with_patch(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_json_fence() {
        let reply = "```json\n{\"city\": \"Ann Arbor\"}\n```";
        assert_eq!(ExtractorNode::unwrap_fence(reply), "{\"city\": \"Ann Arbor\"}");
    }

    #[test]
    fn unwraps_bare_fence() {
        let reply = "```\n{\"x\": 1}\n```";
        assert_eq!(ExtractorNode::unwrap_fence(reply), "{\"x\": 1}");
    }

    #[test]
    fn falls_back_to_bare_string_for_single_string_field() {
        let mut schema = BTreeMap::new();
        schema.insert("city".to_string(), ParamType::String);
        let extractor = ExtractorNode::new(ExtractorConfig {
            param_schema: schema,
            output_key: default_output_key(),
            llm_config: None,
            custom_prompt: None,
        });
        let parsed = extractor.parse_reply("Ann Arbor").unwrap();
        assert_eq!(parsed["city"], Value::String("Ann Arbor".to_string()));
    }

    #[test]
    fn parses_yaml_fallback() {
        let mut schema = BTreeMap::new();
        schema.insert("city".to_string(), ParamType::String);
        schema.insert("zip".to_string(), ParamType::Int);
        let extractor = ExtractorNode::new(ExtractorConfig {
            param_schema: schema,
            output_key: default_output_key(),
            llm_config: None,
            custom_prompt: None,
        });
        let parsed = extractor.parse_reply("city: Ann Arbor\nzip: 48104").unwrap();
        assert_eq!(parsed["zip"], Value::from(48104));
    }
}

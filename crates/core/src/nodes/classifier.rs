//! Classifier node: chooses an outgoing edge label for an input.
//!
//! State machine: (idle) -> build-prompt -> call-llm -> parse -> {route |
//! clarify | error}. Only the last three are observable.

use crate::context::{Context, ContextPatch};
use crate::error::{GraphError, Result};
use crate::graph::GraphNode;
use crate::node_types::{ExecutionResult, NodeImpl};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved fallback label a classifier routes to when the LLM's reply
/// matches none of `output_labels`. spec.md leaves whether this is
/// configurable as an open question (§9); this crate keeps it fixed,
/// matching the convention the reserved name implies.
pub const CLARIFICATION_LABEL: &str = "clarification";

const DEFAULT_LLM_SERVICE_KEY: &str = "system.default_llm_config";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    pub output_labels: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub llm_config: Option<Value>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub context_read: Vec<String>,
    #[serde(default)]
    pub context_write: Vec<String>,
}

/// Deterministic override for the LLM path: `(input, ctx) -> label`.
pub type ClassificationFn = Box<dyn Fn(&Value, &Context) -> Option<String> + Send + Sync>;

pub struct ClassifierNode {
    config: ClassifierConfig,
    classification_func: Option<ClassificationFn>,
}

impl ClassifierNode {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            classification_func: None,
        }
    }

    pub fn with_classification_func(mut self, f: ClassificationFn) -> Self {
        self.classification_func = Some(f);
        self
    }

    /// The default prompt used when `custom_prompt` is absent. Lists
    /// `output_labels` with a leading `-` and instructs the model to answer
    /// `unknown` — not just "no match" — for ambiguous or out-of-taxonomy
    /// input, matching the richer default prompt `intent_kit`'s classifier
    /// used upstream of this spec's one-line summary.
    pub fn default_prompt(&self, input: &str, context_values: &[(String, Value)]) -> String {
        let mut labels = String::new();
        for label in &self.config.output_labels {
            labels.push_str("- ");
            labels.push_str(label);
            labels.push('\n');
        }

        let mut context_block = String::new();
        if !context_values.is_empty() {
            context_block.push_str("\nRelevant context:\n");
            for (k, v) in context_values {
                context_block.push_str(&format!("- {k}: {v}\n"));
            }
        }

        format!(
            "{description}\n\nClassify the following input into exactly one of these categories:\n{labels}{context_block}\nIf the input is ambiguous or does not clearly fit any category, answer exactly \"unknown\".\n\nInput: {input}\n\nCategory:",
            description = self.config.description,
        )
    }

    fn build_prompt(&self, input: &str, ctx: &Context) -> String {
        let context_values: Vec<(String, Value)> = self
            .config
            .context_read
            .iter()
            .filter_map(|k| ctx.get(k).map(|v| (k.clone(), v.clone())))
            .collect();

        match &self.config.custom_prompt {
            Some(template) => template.replace("{user_input}", input),
            None => self.default_prompt(input, &context_values),
        }
    }

    fn match_label(&self, reply: &str) -> Option<String> {
        let normalized = reply.trim().to_ascii_lowercase();
        for label in &self.config.output_labels {
            if label.to_ascii_lowercase() == normalized {
                return Some(label.clone());
            }
        }
        for label in &self.config.output_labels {
            let lower = label.to_ascii_lowercase();
            if normalized.contains(&lower) || lower.contains(&normalized) {
                return Some(label.clone());
            }
        }
        None
    }
}

#[async_trait]
impl NodeImpl for ClassifierNode {
    async fn execute(&self, node: &GraphNode, input: &Value, ctx: &mut Context) -> Result<ExecutionResult> {
        let input_str = input.as_str().map(str::to_string).unwrap_or_else(|| input.to_string());

        if let Some(func) = &self.classification_func {
            let label = func(input, ctx);
            return Ok(route_label(label));
        }

        let Some(llm_service) = ctx.llm_service().cloned() else {
            return Ok(missing_llm_result(&node.id, "no llm_service set in context"));
        };
        let llm_config = self
            .config
            .llm_config
            .clone()
            .or_else(|| ctx.get(DEFAULT_LLM_SERVICE_KEY).cloned());
        let Some(llm_config) = llm_config else {
            return Ok(missing_llm_result(
                &node.id,
                "no llm_config on this node and no dag default_llm_config",
            ));
        };

        let prompt = self.build_prompt(&input_str, ctx);
        let model = llm_config.get("model").and_then(Value::as_str);
        let response = llm_service
            .generate(&prompt, model)
            .await
            .map_err(|e| GraphError::Classification {
                node: node.id.clone(),
                reason: e.to_string(),
            })?;

        let label = self.match_label(&response.content);
        Ok(route_label(label))
    }
}

fn missing_llm_result(node_id: &str, reason: &str) -> ExecutionResult {
    let patch = ContextPatch::new(node_id.to_string())
        .with("error", Value::String(reason.to_string()))
        .with("error_type", Value::String("ClassificationError".to_string()));
    ExecutionResult::new().with_patch(patch).terminating()
}

fn route_label(label: Option<String>) -> ExecutionResult {
    match label {
        Some(label) => {
            let patch = ContextPatch::new("classifier").with("chosen_label", Value::String(label.clone()));
            ExecutionResult::new()
                .with_data(Value::String(label.clone()))
                .with_next_edges(vec![label])
                .with_patch(patch)
        }
        None => {
            let patch = ContextPatch::new("classifier").with("chosen_label", Value::Null);
            ExecutionResult::new()
                .with_next_edges(vec![CLARIFICATION_LABEL.to_string()])
                .with_patch(patch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;

    fn node() -> GraphNode {
        GraphNode::new("classify", NodeType::Classifier, Value::Null)
    }

    #[tokio::test]
    async fn classification_func_overrides_llm_path() {
        let config = ClassifierConfig {
            output_labels: vec!["greet".to_string(), "farewell".to_string()],
            description: "greetings".to_string(),
            llm_config: None,
            custom_prompt: None,
            context_read: vec![],
            context_write: vec![],
        };
        let classifier = ClassifierNode::new(config).with_classification_func(Box::new(|input, _ctx| {
            input.as_str().map(|s| if s.contains("bye") { "farewell" } else { "greet" }.to_string())
        }));
        let mut ctx = Context::new();
        let result = classifier
            .execute(&node(), &Value::String("hello there".to_string()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(result.next_edges, Some(vec!["greet".to_string()]));
    }

    #[tokio::test]
    async fn missing_llm_service_terminates_with_classification_error() {
        let config = ClassifierConfig {
            output_labels: vec!["greet".to_string()],
            description: "greetings".to_string(),
            llm_config: None,
            custom_prompt: None,
            context_read: vec![],
            context_write: vec![],
        };
        let classifier = ClassifierNode::new(config);
        let mut ctx = Context::new();
        let result = classifier
            .execute(&node(), &Value::String("hi".to_string()), &mut ctx)
            .await
            .unwrap();
        assert!(result.terminate);
    }

    #[test]
    fn match_label_falls_back_to_substring() {
        let config = ClassifierConfig {
            output_labels: vec!["weather_query".to_string()],
            description: String::new(),
            llm_config: None,
            custom_prompt: None,
            context_read: vec![],
            context_write: vec![],
        };
        let classifier = ClassifierNode::new(config);
        assert_eq!(classifier.match_label("weather_query please"), Some("weather_query".to_string()));
        assert_eq!(classifier.match_label("something unrelated"), None);
    }
}

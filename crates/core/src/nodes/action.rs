//! Action node: invokes a host-supplied callable with parameters drawn from context.

use crate::context::{Context, ContextPatch};
use crate::error::{GraphError, Result};
use crate::graph::GraphNode;
use crate::node_types::{ExecutionResult, NodeImpl};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_param_key() -> String {
    "extracted_params".to_string()
}

fn default_terminate_on_success() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionConfig {
    #[serde(default = "default_param_key")]
    pub param_key: String,
    #[serde(default)]
    pub param_keys: Vec<String>,
    #[serde(default)]
    pub context_read: Vec<String>,
    #[serde(default)]
    pub context_write: Vec<String>,
    #[serde(default = "default_terminate_on_success")]
    pub terminate_on_success: bool,
}

/// Host-supplied callable: `kwargs -> Result<return_value, error message>`.
pub type ActionFn = Box<dyn Fn(&serde_json::Map<String, Value>) -> std::result::Result<Value, String> + Send + Sync>;

pub struct ActionNode {
    config: ActionConfig,
    action: ActionFn,
}

impl ActionNode {
    pub fn new(config: ActionConfig, action: ActionFn) -> Self {
        Self { config, action }
    }

    fn resolve_params(&self, ctx: &Context) -> serde_json::Map<String, Value> {
        let mut candidates = vec![self.config.param_key.clone()];
        candidates.extend(self.config.param_keys.iter().cloned());

        for key in &candidates {
            if let Some(Value::Object(map)) = ctx.get(key) {
                return map.clone();
            }
        }
        serde_json::Map::new()
    }
}

#[async_trait]
impl NodeImpl for ActionNode {
    async fn execute(&self, node: &GraphNode, _input: &Value, ctx: &mut Context) -> Result<ExecutionResult> {
        let params = self.resolve_params(ctx);

        let mut kwargs = params.clone();
        for key in &self.config.context_read {
            if let Some(v) = ctx.get(key) {
                kwargs.insert(key.clone(), v.clone());
            }
        }

        let return_value = (self.action)(&kwargs).map_err(|reason| GraphError::ActionExecution {
            node: node.id.clone(),
            reason,
        })?;

        let mut patch = ContextPatch::new(node.id.clone())
            .with("action_result", return_value.clone())
            .with("action_name", Value::String(node.id.clone()));

        for key in &self.config.context_write {
            if let Some(v) = kwargs.get(key) {
                patch = patch.with(key.clone(), v.clone());
            }
            if key.ends_with(".requests") {
                let current = ctx.get(key).and_then(Value::as_i64).unwrap_or(0);
                patch = patch.with(key.clone(), Value::from(current + 1));
            }
        }

        if !ctx.has("user.first_seen") {
            patch = patch.with("user.first_seen", Value::String(chrono::Utc::now().to_rfc3339()));
        }

        let next_edges = if self.config.terminate_on_success {
            None
        } else {
            Some(vec!["next".to_string()])
        };

        let mut result = ExecutionResult::new().with_data(return_value).with_patch(patch);
        result.next_edges = next_edges;
        result.terminate = self.config.terminate_on_success;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;
    use serde_json::json;

    fn node() -> GraphNode {
        GraphNode::new("book_flight", NodeType::Action, Value::Null)
    }

    #[tokio::test]
    async fn resolves_params_from_fallback_list() {
        let config = ActionConfig {
            param_key: "extracted_params".to_string(),
            param_keys: vec!["legacy_params".to_string()],
            context_read: vec![],
            context_write: vec![],
            terminate_on_success: true,
        };
        let action = ActionNode::new(
            config,
            Box::new(|kwargs| Ok(Value::Object(kwargs.clone()))),
        );
        let mut ctx = Context::new();
        ctx.set("legacy_params", json!({"city": "Ann Arbor"}), "test");
        let result = action.execute(&node(), &Value::Null, &mut ctx).await.unwrap();
        assert_eq!(result.data, Some(json!({"city": "Ann Arbor"})));
    }

    #[tokio::test]
    async fn increments_requests_counter() {
        let config = ActionConfig {
            param_key: "extracted_params".to_string(),
            param_keys: vec![],
            context_read: vec![],
            context_write: vec!["weather.requests".to_string()],
            terminate_on_success: true,
        };
        let action = ActionNode::new(config, Box::new(|_| Ok(Value::Null)));
        let mut ctx = Context::new();
        ctx.set("weather.requests", json!(3), "test");
        let result = action.execute(&node(), &Value::Null, &mut ctx).await.unwrap();
        assert_eq!(result.context_patch.data.get("weather.requests"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn sets_first_seen_only_absent() {
        let config = ActionConfig {
            param_key: "extracted_params".to_string(),
            param_keys: vec![],
            context_read: vec![],
            context_write: vec![],
            terminate_on_success: true,
        };
        let action = ActionNode::new(config, Box::new(|_| Ok(Value::Null)));
        let mut ctx = Context::new();
        ctx.set("user.first_seen", json!("already-set"), "test");
        let result = action.execute(&node(), &Value::Null, &mut ctx).await.unwrap();
        assert!(!result.context_patch.data.contains_key("user.first_seen"));
    }

    #[tokio::test]
    async fn action_failure_surfaces_as_action_execution_error() {
        let config = ActionConfig {
            param_key: "extracted_params".to_string(),
            param_keys: vec![],
            context_read: vec![],
            context_write: vec![],
            terminate_on_success: true,
        };
        let action = ActionNode::new(config, Box::new(|_| Err("boom".to_string())));
        let mut ctx = Context::new();
        let err = action.execute(&node(), &Value::Null, &mut ctx).await.unwrap_err();
        assert!(matches!(err, GraphError::ActionExecution { .. }));
    }
}

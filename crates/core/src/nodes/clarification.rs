//! Clarification node: presents a fallback message and stops. Has no
//! dependencies and never fails.

use crate::context::{Context, ContextPatch};
use crate::error::Result;
use crate::graph::GraphNode;
use crate::node_types::{ExecutionResult, NodeImpl};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClarificationConfig {
    pub clarification_message: String,
    #[serde(default)]
    pub available_options: Vec<String>,
}

pub struct ClarificationNode {
    config: ClarificationConfig,
}

impl ClarificationNode {
    pub fn new(config: ClarificationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NodeImpl for ClarificationNode {
    async fn execute(&self, node: &GraphNode, _input: &Value, _ctx: &mut Context) -> Result<ExecutionResult> {
        let patch = ContextPatch::new(node.id.clone()).with("clarification_requested", Value::Bool(true));
        let data = serde_json::json!({
            "clarification_message": self.config.clarification_message,
            "available_options": self.config.available_options,
        });
        Ok(ExecutionResult::new().with_data(data).with_patch(patch).terminating())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;

    #[tokio::test]
    async fn always_terminates_with_message() {
        let config = ClarificationConfig {
            clarification_message: "could you rephrase that?".to_string(),
            available_options: vec!["weather".to_string(), "news".to_string()],
        };
        let node = ClarificationNode::new(config);
        let graph_node = GraphNode::new("clarify", NodeType::Clarification, Value::Null);
        let mut ctx = Context::new();
        let result = node.execute(&graph_node, &Value::Null, &mut ctx).await.unwrap();
        assert!(result.terminate);
        assert_eq!(
            result.context_patch.data.get("clarification_requested"),
            Some(&Value::Bool(true))
        );
    }
}

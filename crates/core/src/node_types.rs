//! The node execution contract: [`NodeImpl`], [`ExecutionResult`], [`MetricValue`].

use crate::context::Context;
use crate::error::Result;
use crate::graph::GraphNode;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A metric emitted by a node. Numeric values aggregate across a `RunDAG`
/// call by summing matching keys; everything else is last-write, per §3.
#[derive(Debug, Clone)]
pub enum MetricValue {
    Number(f64),
    Other(Value),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Other(_) => None,
        }
    }
}

/// The output of one node's execution, consumed by the traversal engine in
/// the same step it was produced and never retained — see the lifecycle
/// note on [`crate::graph::IntentDAG`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// User-visible output. `None` for nodes with nothing to surface (e.g.
    /// an extractor mid-chain).
    pub data: Option<Value>,
    /// Edge labels to follow, in order. Empty or `None` stops propagation at
    /// this node without terminating the whole traversal.
    pub next_edges: Option<Vec<String>>,
    /// Halts traversal entirely when true.
    pub terminate: bool,
    pub metrics: HashMap<String, MetricValue>,
    pub context_patch: crate::context::ContextPatch,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_next_edges(mut self, edges: Vec<String>) -> Self {
        self.next_edges = Some(edges);
        self
    }

    pub fn terminating(mut self) -> Self {
        self.terminate = true;
        self
    }

    pub fn with_patch(mut self, patch: crate::context::ContextPatch) -> Self {
        self.context_patch = patch;
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: MetricValue) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// Per-node-kind execution. One implementation per [`crate::graph::NodeType`];
/// `resolve_impl` in [`crate::traversal::RunDagOptions`] maps a [`GraphNode`]
/// to the `NodeImpl` that should run it.
#[async_trait]
pub trait NodeImpl: Send + Sync {
    async fn execute(&self, node: &GraphNode, input: &Value, ctx: &mut Context) -> Result<ExecutionResult>;
}

/// `GraphNode -> Option<Box<dyn NodeImpl>>`, consulted once per visited node.
/// Returning `None` for a node type the caller doesn't support surfaces as
/// [`crate::error::GraphError::Traversal`] ("missing resolver").
pub type Resolver = Box<dyn Fn(&GraphNode) -> Option<Box<dyn NodeImpl>> + Send + Sync>;

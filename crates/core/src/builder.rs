//! [`GraphBuilder`] — mutation API for constructing an [`IntentDAG`].
//!
//! All mutation operations are rejected once `build()` has produced a frozen
//! DAG. Construction typically looks like:
//!
//! ```rust
//! use intent_graph_core::builder::GraphBuilder;
//! use intent_graph_core::graph::NodeType;
//! use serde_json::json;
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_node("greet", NodeType::Clarification, json!({
//!     "clarification_message": "please rephrase",
//!     "available_options": [],
//! })).unwrap();
//! builder.set_entrypoints(vec!["greet".to_string()]).unwrap();
//! let dag = builder.build(true).unwrap();
//! assert_eq!(dag.entrypoints(), &["greet".to_string()]);
//! ```

use crate::error::{GraphError, Result};
use crate::graph::{GraphNode, IntentDAG, NodeType, UNLABELED};
use crate::validator::{validate, ValidationIssue};
use std::collections::{BTreeMap, BTreeSet};

/// Mutable graph under construction.
///
/// Every mutation method returns a [`GraphError::FrozenGraph`] once the
/// builder has produced a DAG via [`GraphBuilder::build`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<String, GraphNode>,
    adj: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    rev: BTreeMap<String, BTreeSet<String>>,
    entrypoints: Vec<String>,
    metadata: serde_json::Map<String, serde_json::Value>,
    producer_labels: BTreeMap<String, BTreeSet<String>>,
    frozen: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_not_frozen(&self, op: &str) -> Result<()> {
        if self.frozen {
            return Err(GraphError::FrozenGraph(op.to_string()));
        }
        Ok(())
    }

    /// Add a node. Rejects duplicate ids.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        node_type: NodeType,
        config: serde_json::Value,
    ) -> Result<&mut Self> {
        self.check_not_frozen("AddNode")?;
        let id = id.into();
        if id.is_empty() {
            return Err(GraphError::Validation("node id must be non-empty".to_string()));
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::Validation(format!("duplicate node id '{id}'")));
        }
        self.nodes.insert(id.clone(), GraphNode::new(id, node_type, config));
        Ok(self)
    }

    /// Add an edge. `label: None` registers a label-free ("fall-through")
    /// edge, followed only when the source node's `next_edges` is empty —
    /// see the design note on label-free edges in the module-level
    /// documentation of [`crate::traversal`].
    pub fn add_edge(
        &mut self,
        src: impl Into<String>,
        dst: impl Into<String>,
        label: Option<&str>,
    ) -> Result<&mut Self> {
        self.check_not_frozen("AddEdge")?;
        let src = src.into();
        let dst = dst.into();
        if !self.nodes.contains_key(&src) {
            return Err(GraphError::Validation(format!("edge source '{src}' does not exist")));
        }
        if !self.nodes.contains_key(&dst) {
            return Err(GraphError::Validation(format!("edge target '{dst}' does not exist")));
        }
        let label = label.unwrap_or(UNLABELED).to_string();
        self.adj
            .entry(src.clone())
            .or_default()
            .entry(label)
            .or_default()
            .push(dst.clone());
        self.rev.entry(dst).or_default().insert(src);
        Ok(self)
    }

    /// Remove a node, all edges touching it, and its entrypoint membership.
    pub fn remove_node(&mut self, id: &str) -> Result<&mut Self> {
        self.check_not_frozen("RemoveNode")?;
        self.nodes.remove(id);
        self.adj.remove(id);
        for by_label in self.adj.values_mut() {
            for dsts in by_label.values_mut() {
                dsts.retain(|d| d != id);
            }
        }
        self.rev.remove(id);
        for preds in self.rev.values_mut() {
            preds.remove(id);
        }
        self.entrypoints.retain(|e| e != id);
        self.producer_labels.remove(id);
        Ok(self)
    }

    /// Declare the graph's entrypoints, in the order traversal should run them.
    pub fn set_entrypoints(&mut self, ids: Vec<String>) -> Result<&mut Self> {
        self.check_not_frozen("SetEntrypoints")?;
        for id in &ids {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::Validation(format!("entrypoint '{id}' does not exist")));
            }
        }
        self.entrypoints = ids;
        Ok(self)
    }

    /// Set `metadata.default_llm_config`, inherited by nodes lacking their own.
    pub fn with_default_llm_config(&mut self, config: serde_json::Value) -> Result<&mut Self> {
        self.check_not_frozen("WithDefaultLLMConfig")?;
        self.metadata.insert("default_llm_config".to_string(), config);
        Ok(self)
    }

    /// Supply the `producer_labels: id -> set<label>` map consulted by the
    /// validator's label-coverage check (§4.2 point 5), without threading it
    /// through every node config by hand.
    pub fn with_producer_labels(
        &mut self,
        producer_labels: BTreeMap<String, BTreeSet<String>>,
    ) -> Result<&mut Self> {
        self.check_not_frozen("WithProducerLabels")?;
        self.producer_labels = producer_labels;
        Ok(self)
    }

    /// Freeze the builder and, unless `validate` is false, run the static
    /// validator, surfacing any hard error as `Err` and discarding warnings.
    /// Use `validate = false` only for test scaffolding; production callers
    /// should inspect `validate_with_issues` instead if warnings matter.
    pub fn build(mut self, validate_flag: bool) -> Result<IntentDAG> {
        self.check_not_frozen("Build")?;
        self.frozen = true;

        if self.entrypoints.is_empty() {
            return Err(GraphError::Validation("no entrypoints".to_string()));
        }

        let dag = IntentDAG {
            nodes: self.nodes,
            adj: self.adj,
            rev: self.rev,
            entrypoints: self.entrypoints,
            metadata: self.metadata,
        };

        if validate_flag {
            let issues = validate(&dag, &self.producer_labels)?;
            for issue in &issues {
                if let ValidationIssue::Warning(msg) = issue {
                    tracing::warn!(target: "intent_graph_core::builder", "{msg}");
                }
            }
        }

        Ok(dag)
    }

    /// Parse an `IntentDAG` from the graph JSON wire format (§6).
    ///
    /// Rejection rules: missing `nodes`/`edges`/`entrypoints` is a hard
    /// error; each node config must be a map with a `type`; each edge must
    /// have `from` and `to`; `entrypoints` must be a list.
    pub fn from_json(spec: &serde_json::Value) -> Result<Self> {
        let obj = spec
            .as_object()
            .ok_or_else(|| GraphError::Validation("graph spec must be a JSON object".to_string()))?;

        let nodes = obj
            .get("nodes")
            .and_then(|v| v.as_object())
            .ok_or_else(|| GraphError::Validation("missing 'nodes'".to_string()))?;
        let edges = obj
            .get("edges")
            .and_then(|v| v.as_array())
            .ok_or_else(|| GraphError::Validation("missing 'edges'".to_string()))?;
        let entrypoints = obj
            .get("entrypoints")
            .and_then(|v| v.as_array())
            .ok_or_else(|| GraphError::Validation("missing 'entrypoints'".to_string()))?;

        let mut builder = GraphBuilder::new();

        for (id, node_spec) in nodes {
            let node_obj = node_spec
                .as_object()
                .ok_or_else(|| GraphError::Validation(format!("node '{id}' config must be a map")))?;
            let type_str = node_obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| GraphError::Validation(format!("node '{id}' missing 'type'")))?;
            let node_type = NodeType::parse(type_str)
                .ok_or_else(|| GraphError::Validation(format!("node '{id}' has unknown type '{type_str}'")))?;
            builder.add_node(id.clone(), node_type, node_spec.clone())?;
        }

        for edge in edges {
            let edge_obj = edge
                .as_object()
                .ok_or_else(|| GraphError::Validation("edge must be a map".to_string()))?;
            let from = edge_obj
                .get("from")
                .and_then(|v| v.as_str())
                .ok_or_else(|| GraphError::Validation("edge missing 'from'".to_string()))?;
            let to = edge_obj
                .get("to")
                .and_then(|v| v.as_str())
                .ok_or_else(|| GraphError::Validation("edge missing 'to'".to_string()))?;
            let label = edge_obj.get("label").and_then(|v| v.as_str());
            builder.add_edge(from, to, label)?;
        }

        let entrypoint_ids: Result<Vec<String>> = entrypoints
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| GraphError::Validation("entrypoints must be strings".to_string()))
            })
            .collect();
        builder.set_entrypoints(entrypoint_ids?)?;

        if let Some(metadata) = obj.get("metadata").and_then(|v| v.as_object()) {
            builder.metadata = metadata.clone();
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_duplicate_node_id() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Action, json!({})).unwrap();
        assert!(b.add_node("a", NodeType::Action, json!({})).is_err());
    }

    #[test]
    fn rejects_edge_to_missing_node() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Action, json!({})).unwrap();
        assert!(b.add_edge("a", "ghost", None).is_err());
    }

    #[test]
    fn rejects_mutation_after_build() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Clarification, json!({})).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let builder = b;
        let result = builder.build(false);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_build_with_no_entrypoints() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Clarification, json!({})).unwrap();
        assert!(b.build(false).is_err());
    }

    #[test]
    fn from_json_rejects_missing_entrypoints() {
        let spec = json!({"nodes": {}, "edges": []});
        assert!(GraphBuilder::from_json(&spec).is_err());
    }

    #[test]
    fn from_json_round_trips() {
        let spec = json!({
            "nodes": {
                "a": {"type": "clarification", "clarification_message": "hi", "available_options": []}
            },
            "edges": [],
            "entrypoints": ["a"],
        });
        let dag = GraphBuilder::from_json(&spec).unwrap().build(false).unwrap();
        assert_eq!(dag.entrypoints(), &["a".to_string()]);
    }
}

//! Core graph data structures: [`GraphNode`] and [`IntentDAG`].
//!
//! # Graph Architecture
//!
//! An `IntentDAG` is a directed graph of four node kinds — classifier,
//! extractor, action, clarification — connected by labeled edges. A
//! classifier never points at its successors directly; it emits a label, and
//! the DAG's adjacency map resolves that label to the next node(s). This
//! keeps nodes value-typed and the graph the single source of truth for
//! topology.
//!
//! ```text
//! entrypoints: ["classify"]
//!
//!   classify ──"greet"──▶ extract_name ──"success"──▶ greet_action
//!            └─"clarification"──▶ clarify
//! ```
//!
//! Construction goes through [`crate::builder::GraphBuilder`]; an `IntentDAG`
//! itself is immutable once built.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The reserved edge label the traversal engine falls back to when a node
/// emits no `next_edges` and declares no labeled edge for a given source —
/// see [`crate::builder::GraphBuilder::add_edge`].
pub const UNLABELED: &str = "__unlabeled__";

/// The kind of a [`GraphNode`], selecting which implementation executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Classifier,
    Extractor,
    Action,
    Clarification,
}

impl NodeType {
    /// Parse a wire-format type string (`"classifier"`, `"extractor"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "classifier" => Some(NodeType::Classifier),
            "extractor" => Some(NodeType::Extractor),
            "action" => Some(NodeType::Action),
            "clarification" => Some(NodeType::Clarification),
            _ => None,
        }
    }

    /// Render back to the wire-format type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Classifier => "classifier",
            NodeType::Extractor => "extractor",
            NodeType::Action => "action",
            NodeType::Clarification => "clarification",
        }
    }
}

/// An immutable node record.
///
/// `config` is opaque to the graph and the traversal engine; each node kind
/// deserializes its own config shape from it (see
/// [`crate::nodes::classifier::ClassifierConfig`],
/// [`crate::nodes::extractor::ExtractorConfig`],
/// [`crate::nodes::action::ActionConfig`],
/// [`crate::nodes::clarification::ClarificationConfig`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Non-empty, unique within the graph.
    pub id: String,
    /// Selects the node implementation.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Node-kind-specific configuration.
    pub config: serde_json::Value,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, config: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            node_type,
            config,
        }
    }
}

/// An immutable, frozen directed graph of [`GraphNode`]s.
///
/// Produced by [`crate::builder::GraphBuilder::build`]. All collections use
/// `BTreeMap`/`BTreeSet` rather than hash-based containers so that iteration
/// order is deterministic wherever the traversal engine relies on it — edge
/// insertion order within one `(src, label)` pair is additionally preserved
/// via an explicit `Vec`, since declaration order (not sorted order) governs
/// fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDAG {
    pub(crate) nodes: BTreeMap<String, GraphNode>,
    /// `src_id -> (label -> destinations, in declared order)`.
    pub(crate) adj: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// `dst_id -> set of src_id`, precomputed for reachability analysis.
    pub(crate) rev: BTreeMap<String, BTreeSet<String>>,
    /// Declaration order; multiple entrypoints run in this order.
    pub(crate) entrypoints: Vec<String>,
    /// Free-form metadata. The well-known key `default_llm_config` holds a
    /// provider config inherited by nodes lacking their own.
    pub(crate) metadata: serde_json::Map<String, serde_json::Value>,
}

impl IntentDAG {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// All node ids, in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entrypoints, in declaration order.
    pub fn entrypoints(&self) -> &[String] {
        &self.entrypoints
    }

    /// Destinations reachable from `src` under exactly `label` (or
    /// [`UNLABELED`]), in declared edge order.
    pub fn successors(&self, src: &str, label: &str) -> &[String] {
        self.adj
            .get(src)
            .and_then(|by_label| by_label.get(label))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All labels declared as outgoing from `src`.
    pub fn labels_of(&self, src: &str) -> impl Iterator<Item = &String> {
        self.adj.get(src).into_iter().flat_map(|m| m.keys())
    }

    /// Predecessors of `dst`, used by the validator's reachability check.
    pub fn predecessors(&self, dst: &str) -> impl Iterator<Item = &String> {
        self.rev.get(dst).into_iter().flatten()
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    /// The DAG-level default LLM config, if set via
    /// `WithDefaultLLMConfig`/`metadata["default_llm_config"]`.
    pub fn default_llm_config(&self) -> Option<&serde_json::Value> {
        self.metadata.get("default_llm_config")
    }

    /// Serialize to the graph JSON wire format (§6).
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        let nodes: serde_json::Map<String, serde_json::Value> = self
            .nodes
            .iter()
            .map(|(id, node)| {
                let mut obj = match node.config.clone() {
                    serde_json::Value::Object(m) => m,
                    other => {
                        let mut m = serde_json::Map::new();
                        m.insert("value".to_string(), other);
                        m
                    }
                };
                obj.insert(
                    "type".to_string(),
                    serde_json::Value::String(node.node_type.as_str().to_string()),
                );
                (id.clone(), serde_json::Value::Object(obj))
            })
            .collect();

        let mut edges = Vec::new();
        for (src, by_label) in &self.adj {
            for (label, dsts) in by_label {
                for dst in dsts {
                    let mut edge = serde_json::Map::new();
                    edge.insert("from".to_string(), serde_json::Value::String(src.clone()));
                    edge.insert("to".to_string(), serde_json::Value::String(dst.clone()));
                    if label != UNLABELED {
                        edge.insert("label".to_string(), serde_json::Value::String(label.clone()));
                    }
                    edges.push(serde_json::Value::Object(edge));
                }
            }
        }

        Ok(serde_json::json!({
            "nodes": nodes,
            "edges": edges,
            "entrypoints": self.entrypoints,
            "metadata": self.metadata,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;

    fn simple_dag() -> IntentDAG {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Classifier, serde_json::json!({}))
            .unwrap();
        b.add_node("b", NodeType::Clarification, serde_json::json!({}))
            .unwrap();
        b.add_edge("a", "b", Some("clarification")).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        b.build(false).unwrap()
    }

    #[test]
    fn successors_respect_label() {
        let dag = simple_dag();
        assert_eq!(dag.successors("a", "clarification"), &["b".to_string()]);
        assert!(dag.successors("a", "nope").is_empty());
    }

    #[test]
    fn to_json_round_trips_node_count() {
        let dag = simple_dag();
        let json = dag.to_json().unwrap();
        assert_eq!(json["nodes"].as_object().unwrap().len(), 2);
        assert_eq!(json["entrypoints"], serde_json::json!(["a"]));
    }
}

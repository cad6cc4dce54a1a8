//! # intent-graph-core — intent routing DAG engine
//!
//! A programmable DAG executor that dispatches a natural-language input to
//! one of several host-registered actions by walking a graph of four node
//! kinds: [`graph::NodeType::Classifier`], [`graph::NodeType::Extractor`],
//! [`graph::NodeType::Action`], and [`graph::NodeType::Clarification`].
//!
//! ## Building a graph
//!
//! ```rust
//! use intent_graph_core::builder::GraphBuilder;
//! use intent_graph_core::graph::NodeType;
//! use serde_json::json;
//!
//! let mut builder = GraphBuilder::new();
//! builder
//!     .add_node(
//!         "clarify",
//!         NodeType::Clarification,
//!         json!({"clarification_message": "please rephrase", "available_options": []}),
//!     )
//!     .unwrap();
//! builder.set_entrypoints(vec!["clarify".to_string()]).unwrap();
//! let dag = builder.build(true).unwrap();
//! assert_eq!(dag.len(), 1);
//! ```
//!
//! ## Running traversal
//!
//! [`traversal::run_dag`] walks the frozen DAG breadth-first, dispatching
//! each visited node to an implementation resolved via a
//! [`node_types::Resolver`] closure supplied on [`traversal::RunDagOptions`].
//! See that module's docs for the full algorithm.
//!
//! This crate has no dependency on any concrete LLM provider: classifier and
//! extractor nodes talk to an LLM exclusively through the [`llm_client::LLMClient`]
//! trait object a host injects into [`context::Context`]. Concrete providers
//! live in the sibling `intent-llm` crate, which depends on this one for the
//! trait rather than the reverse.

pub mod builder;
pub mod context;
pub mod error;
pub mod graph;
pub mod llm_client;
pub mod node_types;
pub mod nodes;
pub mod param_schema;
pub mod traversal;
pub mod validator;

pub use builder::GraphBuilder;
pub use context::{Context, ContextPatch, Fingerprint, MergePolicy};
pub use error::{GraphError, Result};
pub use graph::{GraphNode, IntentDAG, NodeType, UNLABELED};
pub use llm_client::{LLMClient, RawLlmResponse};
pub use node_types::{ExecutionResult, MetricValue, NodeImpl, Resolver};
pub use param_schema::ParamType;
pub use traversal::{run_dag, AggregatedMetrics, RunDagOptions};
pub use validator::{validate, ValidationIssue};

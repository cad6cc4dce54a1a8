//! Error types for graph construction, validation, and traversal.
//!
//! All errors implement `std::error::Error` via `thiserror`.
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── Validation          - graph structure errors raised at build time
//! ├── Cycle                - a cycle was found during acyclicity validation
//! ├── FrozenGraph          - a mutation was attempted after Freeze()
//! ├── Traversal            - a node execution failed with no error edge
//! ├── TraversalLimit        - max_steps or max_fanout_per_node exceeded
//! ├── ContextConflict       - protected-namespace write or unknown merge policy
//! ├── TypeCoercion          - extractor parameter coercion failed
//! ├── Classification        - classifier had no usable LLM path
//! ├── Extraction            - extractor could not parse or coerce the LLM reply
//! ├── ActionExecution       - the action callable raised
//! ├── Serialization         - JSON (de)serialization of the graph wire format
//! └── Yaml                  - YAML parsing in the extractor's fallback path
//! ```
//!
//! # Example
//!
//! ```rust
//! use intent_graph_core::error::GraphError;
//!
//! fn require_entrypoint(has_one: bool) -> Result<(), GraphError> {
//!     if !has_one {
//!         return Err(GraphError::Validation("no entrypoints".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// All errors surfaced by graph construction, validation, and traversal.
///
/// Matches the error kinds enumerated as the engine's external contract:
/// `TraversalError`, `TraversalLimitError`, `CycleError`, `NodeError`,
/// `ContextConflictError`, `TypeCoercionError`, `ClassificationError`,
/// `ExtractionError`, `ActionExecutionError`.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure is invalid.
    ///
    /// **Common causes**: missing `nodes`/`edges`/`entrypoints` in the JSON
    /// wire format, a node type not in `{classifier, extractor, action,
    /// clarification}`, an edge endpoint referencing a node that doesn't
    /// exist, no entrypoints declared.
    ///
    /// **Recovery**: fix the graph before calling `Build()` again.
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// The static validator's acyclicity check found a cycle.
    ///
    /// Carries the offending cycle as an ordered list of node ids, recovered
    /// from the three-color DFS parent chain.
    #[error("cycle detected: {}", .cycle.join(" -> "))]
    Cycle {
        /// The cycle, in traversal order, with the repeated node at both ends.
        cycle: Vec<String>,
    },

    /// A mutation (`AddNode`, `AddEdge`, `RemoveNode`, ...) was attempted on a
    /// graph builder after `Freeze()` had already produced an [`crate::graph::IntentDAG`].
    #[error("graph is frozen: {0}")]
    FrozenGraph(String),

    /// A node's execution raised and no `"error"` edge was attached at that
    /// node, or the traversal engine could not resolve an implementation for
    /// a node's type.
    ///
    /// Carries the failing node id, the traversal step index at which the
    /// failure occurred, and the causal error message.
    #[error("traversal failed at node '{node}' (step {step}): {cause}")]
    Traversal {
        /// Id of the node that failed.
        node: String,
        /// 1-based step index within the `RunDAG` call.
        step: usize,
        /// The underlying cause.
        cause: String,
    },

    /// `max_steps` or `max_fanout_per_node` was exceeded.
    #[error("traversal limit exceeded at step {step}: {reason}")]
    TraversalLimit {
        /// Step index at which the limit tripped.
        step: usize,
        /// Which limit tripped and its configured value.
        reason: String,
    },

    /// A patch attempted to write a protected-namespace key (`private.*`), or
    /// named a merge policy the context doesn't know how to apply (e.g. a
    /// `reduce` policy with no registered reducer for that key).
    ///
    /// Fatal: this indicates a bug in the calling node or host, not a
    /// recoverable runtime condition.
    #[error("context conflict: {0}")]
    ContextConflict(String),

    /// An extractor could not coerce a parsed field to its declared
    /// [`crate::param_schema::ParamType`].
    #[error("type coercion failed for field '{field}': {reason}")]
    TypeCoercion {
        /// Name of the field that failed to coerce.
        field: String,
        /// Why coercion failed.
        reason: String,
    },

    /// A classifier node had neither a `classification_func` override nor a
    /// usable `(llm_service, llm_config)` pair.
    #[error("classification failed at node '{node}': {reason}")]
    Classification {
        /// Id of the failing classifier node.
        node: String,
        /// Reason the classifier could not run.
        reason: String,
    },

    /// An extractor node could not parse the LLM's reply as JSON, a fenced
    /// JSON/YAML block, YAML, or (for single-string-field schemas) a bare
    /// string.
    #[error("extraction failed at node '{node}': {reason}")]
    Extraction {
        /// Id of the failing extractor node.
        node: String,
        /// Reason extraction failed.
        reason: String,
    },

    /// An action node's callable raised.
    #[error("action '{node}' failed: {reason}")]
    ActionExecution {
        /// Id of the failing action node.
        node: String,
        /// The callable's error message.
        reason: String,
    },

    /// JSON (de)serialization of the graph wire format or a node's config
    /// failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing failed in the extractor's JSON-then-YAML fallback path.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GraphError {
    /// Build a [`GraphError::Traversal`] with context.
    pub fn traversal(node: impl Into<String>, step: usize, cause: impl Into<String>) -> Self {
        Self::Traversal {
            node: node.into(),
            step,
            cause: cause.into(),
        }
    }

    /// Build a [`GraphError::ContextConflict`] for a protected-namespace write.
    pub fn protected_namespace(key: impl AsRef<str>) -> Self {
        Self::ContextConflict(format!("write to protected namespace: '{}'", key.as_ref()))
    }

    /// Build a [`GraphError::ContextConflict`] for an unrecognized merge policy name.
    pub fn unknown_policy(policy: impl AsRef<str>) -> Self {
        Self::ContextConflict(format!("unknown merge policy: '{}'", policy.as_ref()))
    }

    /// True if this error originated from a node-execution failure with no
    /// error edge, as opposed to a build-time or configuration error.
    pub fn is_traversal_failure(&self) -> bool {
        matches!(
            self,
            GraphError::Traversal { .. } | GraphError::TraversalLimit { .. }
        )
    }
}

//! The BFS traversal engine: [`run_dag`] and [`RunDagOptions`].
//!
//! Single-threaded cooperative scheduling — nodes execute sequentially in
//! BFS order within one `run_dag` call. Concurrency is external: a host may
//! call `run_dag` concurrently on distinct `(dag, ctx)` pairs, but must
//! serialize (or not share) calls that touch the same `Context`.
//!
//! Label-free ("fall-through") edges, registered via
//! `GraphBuilder::add_edge(src, dst, None)` under [`crate::graph::UNLABELED`],
//! are followed only when a node's `next_edges` is empty or `None` — they
//! exist for node kinds (clarification, and actions with no further
//! classification step) that have exactly one successor and no label to
//! choose between.

use crate::context::{Context, ContextPatch, MergePolicy};
use crate::error::{GraphError, Result};
use crate::graph::{IntentDAG, UNLABELED};
use crate::node_types::{ExecutionResult, MetricValue, Resolver};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Builder-style options for [`run_dag`], matching the teacher's
/// config-struct-with-builder-methods idiom.
pub struct RunDagOptions {
    max_steps: usize,
    max_fanout_per_node: usize,
    resolve_impl: Resolver,
    enable_memoization: bool,
}

impl std::fmt::Debug for RunDagOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunDagOptions")
            .field("max_steps", &self.max_steps)
            .field("max_fanout_per_node", &self.max_fanout_per_node)
            .field("enable_memoization", &self.enable_memoization)
            .finish()
    }
}

impl RunDagOptions {
    pub fn new(resolve_impl: Resolver) -> Self {
        Self {
            max_steps: 1000,
            max_fanout_per_node: 16,
            resolve_impl,
            enable_memoization: false,
        }
    }

    pub fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }

    pub fn max_fanout_per_node(mut self, n: usize) -> Self {
        self.max_fanout_per_node = n;
        self
    }

    pub fn enable_memoization(mut self, on: bool) -> Self {
        self.enable_memoization = on;
        self
    }
}

/// Metrics aggregated across every node visited in one `run_dag` call:
/// matching numeric keys sum, everything else is last-write.
#[derive(Debug, Clone, Default)]
pub struct AggregatedMetrics(pub HashMap<String, MetricValue>);

impl AggregatedMetrics {
    fn absorb(&mut self, metrics: &HashMap<String, MetricValue>) {
        for (k, v) in metrics {
            match (self.0.get(k), v) {
                (Some(MetricValue::Number(existing)), MetricValue::Number(incoming)) => {
                    self.0.insert(k.clone(), MetricValue::Number(existing + incoming));
                }
                _ => {
                    self.0.insert(k.clone(), v.clone());
                }
            }
        }
    }
}

fn hash_input(input: &Value) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    input.to_string().hash(&mut hasher);
    hasher.finish()
}

/// Walk `dag` breadth-first starting from its entrypoints, dispatching each
/// visited node to the implementation `options.resolve_impl` resolves for
/// it, threading `ctx` through the whole call.
///
/// Returns the last node's [`ExecutionResult`] (the one that terminated
/// traversal, or the last one executed if the worklist simply drained) plus
/// aggregated metrics. A [`GraphError::TraversalLimit`] aborts with whatever
/// partial metrics were aggregated so far discarded — per §7, callers that
/// want partial progress on a limit error should lower `max_steps` and
/// retry, since the limit is a hard abort, not a soft cutoff.
pub async fn run_dag(
    dag: &IntentDAG,
    ctx: &mut Context,
    input: &Value,
    options: &RunDagOptions,
) -> Result<(Option<ExecutionResult>, AggregatedMetrics)> {
    if dag.entrypoints().is_empty() {
        return Err(GraphError::Validation("no entrypoints".to_string()));
    }

    if let Some(default_config) = dag.default_llm_config() {
        ctx.set("system.default_llm_config", default_config.clone(), "engine");
    }

    let mut queue: VecDeque<(String, String)> = dag
        .entrypoints()
        .iter()
        .map(|id| (id.clone(), UNLABELED.to_string()))
        .collect();
    let mut seen_steps: std::collections::HashSet<(String, String)> = queue.iter().cloned().collect();
    let mut pending_patches: HashMap<String, ContextPatch> = HashMap::new();
    let mut memo_cache: BTreeMap<(String, u64, u64), (ExecutionResult, HashMap<String, MetricValue>)> =
        BTreeMap::new();

    let mut step = 0usize;
    let mut metrics = AggregatedMetrics::default();
    let mut last_result: Option<ExecutionResult> = None;

    while let Some((node_id, _via_label)) = queue.pop_front() {
        step += 1;
        if step > options.max_steps {
            return Err(GraphError::TraversalLimit {
                step,
                reason: format!("max_steps ({}) exceeded", options.max_steps),
            });
        }

        if let Some(patch) = pending_patches.remove(&node_id) {
            ctx.apply_patch(&patch)?;
        }

        let node = dag
            .node(&node_id)
            .ok_or_else(|| GraphError::traversal(&node_id, step, "node missing from frozen dag"))?;

        let memo_key = options.enable_memoization.then(|| {
            let mut keys: Vec<&String> = ctx.keys().collect();
            keys.sort();
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            for k in keys {
                k.hash(&mut hasher);
            }
            (node_id.clone(), hasher.finish(), hash_input(input))
        });

        let result = if let Some(key) = &memo_key {
            if let Some((cached_result, cached_metrics)) = memo_cache.get(key) {
                ctx.apply_patch(&cached_result.context_patch)?;
                metrics.absorb(cached_metrics);
                cached_result.clone()
            } else {
                let exec = execute_node(dag, node, input, ctx, &options.resolve_impl, step).await?;
                memo_cache.insert(key.clone(), (exec.clone(), exec.metrics.clone()));
                metrics.absorb(&exec.metrics);
                ctx.apply_patch(&exec.context_patch)?;
                exec
            }
        } else {
            let exec = execute_node(dag, node, input, ctx, &options.resolve_impl, step).await?;
            metrics.absorb(&exec.metrics);
            ctx.apply_patch(&exec.context_patch)?;
            exec
        };

        if result.terminate {
            tracing::info!(
                target: "intent_graph_core::traversal",
                node_id = %node_id,
                step,
                "traversal terminated"
            );
            last_result = Some(result);
            return Ok((last_result, metrics));
        }

        let labels: Vec<String> = match &result.next_edges {
            Some(edges) if !edges.is_empty() => edges.clone(),
            _ => vec![UNLABELED.to_string()],
        };

        let mut fanout_this_step = 0usize;
        for label in &labels {
            for dst in dag.successors(&node_id, label) {
                let seen_key = (dst.clone(), label.clone());
                if seen_steps.insert(seen_key) {
                    queue.push_back((dst.clone(), label.clone()));
                    pending_patches
                        .entry(dst.clone())
                        .and_modify(|existing| existing.merge_pending(&result.context_patch))
                        .or_insert_with(|| result.context_patch.clone());
                    fanout_this_step += 1;
                }
            }
        }
        if fanout_this_step > options.max_fanout_per_node {
            return Err(GraphError::TraversalLimit {
                step,
                reason: format!(
                    "max_fanout_per_node ({}) exceeded at node '{node_id}'",
                    options.max_fanout_per_node
                ),
            });
        }

        last_result = Some(result);
    }

    Ok((last_result, metrics))
}

async fn execute_node(
    dag: &IntentDAG,
    node: &crate::graph::GraphNode,
    input: &Value,
    ctx: &mut Context,
    resolve_impl: &Resolver,
    step: usize,
) -> Result<ExecutionResult> {
    let Some(node_impl) = resolve_impl(node) else {
        return Err(GraphError::traversal(
            &node.id,
            step,
            format!("no resolver for node type '{}'", node.node_type.as_str()),
        ));
    };

    tracing::debug!(
        target: "intent_graph_core::traversal",
        node_id = %node.id,
        node_type = node.node_type.as_str(),
        step,
        "executing node"
    );

    let started = std::time::Instant::now();
    match node_impl.execute(node, input, ctx).await {
        Ok(result) => {
            tracing::debug!(
                target: "intent_graph_core::traversal",
                node_id = %node.id,
                step,
                duration_ms = started.elapsed().as_millis() as u64,
                terminate = result.terminate,
                next_edges = ?result.next_edges,
                "node execution finished"
            );
            Ok(result)
        }
        Err(err) => {
            tracing::warn!(
                target: "intent_graph_core::traversal",
                node_id = %node.id,
                step,
                error = %err,
                "node execution failed"
            );
            if dag.successors(&node.id, "error").is_empty() {
                return Err(GraphError::traversal(&node.id, step, err.to_string()));
            }
            Ok(route_error(node, &err))
        }
    }
}

/// Synthesize the error patch and route to the `"error"` edge. Only called
/// once the caller has confirmed that edge exists — see [`execute_node`].
fn route_error(node: &crate::graph::GraphNode, err: &GraphError) -> ExecutionResult {
    let patch = ContextPatch::new(node.id.clone())
        .with("last_error", Value::String(err.to_string()))
        .with("error_node", Value::String(node.id.clone()))
        .with("error_type", Value::String(error_type_name(err).to_string()))
        .with("error_timestamp", Value::String(chrono::Utc::now().to_rfc3339()))
        .with_policy("last_error", MergePolicy::LastWriteWins);

    ExecutionResult::new()
        .with_next_edges(vec!["error".to_string()])
        .with_patch(patch)
}

fn error_type_name(err: &GraphError) -> &'static str {
    match err {
        GraphError::Validation(_) => "ValidationError",
        GraphError::Cycle { .. } => "CycleError",
        GraphError::FrozenGraph(_) => "FrozenGraphError",
        GraphError::Traversal { .. } => "TraversalError",
        GraphError::TraversalLimit { .. } => "TraversalLimitError",
        GraphError::ContextConflict(_) => "ContextConflictError",
        GraphError::TypeCoercion { .. } => "TypeCoercionError",
        GraphError::Classification { .. } => "ClassificationError",
        GraphError::Extraction { .. } => "ExtractionError",
        GraphError::ActionExecution { .. } => "ActionExecutionError",
        GraphError::Serialization(_) => "SerializationError",
        GraphError::Yaml(_) => "YamlError",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::NodeType;
    use crate::node_types::NodeImpl;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoClarification;

    #[async_trait]
    impl NodeImpl for EchoClarification {
        async fn execute(
            &self,
            node: &crate::graph::GraphNode,
            _input: &Value,
            _ctx: &mut Context,
        ) -> Result<ExecutionResult> {
            Ok(ExecutionResult::new()
                .with_data(json!({"node": node.id}))
                .terminating())
        }
    }

    struct FailingAction;

    #[async_trait]
    impl NodeImpl for FailingAction {
        async fn execute(
            &self,
            _node: &crate::graph::GraphNode,
            _input: &Value,
            _ctx: &mut Context,
        ) -> Result<ExecutionResult> {
            Err(GraphError::ActionExecution {
                node: "boom".to_string(),
                reason: "simulated failure".to_string(),
            })
        }
    }

    fn resolver() -> Resolver {
        Box::new(|node| match node.node_type {
            NodeType::Clarification => Some(Box::new(EchoClarification) as Box<dyn NodeImpl>),
            NodeType::Action => Some(Box::new(FailingAction) as Box<dyn NodeImpl>),
            _ => None,
        })
    }

    #[tokio::test]
    async fn single_entrypoint_terminates() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Clarification, json!({})).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let dag = b.build(false).unwrap();
        let mut ctx = Context::new();
        let options = RunDagOptions::new(resolver());
        let (result, _) = run_dag(&dag, &mut ctx, &json!("hi"), &options).await.unwrap();
        assert!(result.unwrap().terminate);
    }

    #[tokio::test]
    async fn routes_to_error_edge_on_failure() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Action, json!({})).unwrap();
        b.add_node("fallback", NodeType::Clarification, json!({})).unwrap();
        b.add_edge("a", "fallback", Some("error")).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let dag = b.build(false).unwrap();
        let mut ctx = Context::new();
        let options = RunDagOptions::new(resolver());
        let (result, _) = run_dag(&dag, &mut ctx, &json!("hi"), &options).await.unwrap();
        let result = result.unwrap();
        assert!(result.terminate);
        assert_eq!(result.data, Some(json!({"node": "fallback"})));
        assert!(ctx.get("last_error").is_some());
    }

    #[tokio::test]
    async fn fatal_when_no_error_edge() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Action, json!({})).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let dag = b.build(false).unwrap();
        let mut ctx = Context::new();
        let options = RunDagOptions::new(resolver());
        let err = run_dag(&dag, &mut ctx, &json!("hi"), &options).await.unwrap_err();
        assert!(matches!(err, GraphError::Traversal { .. }));
    }

    #[tokio::test]
    async fn max_steps_limit_aborts() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Action, json!({})).unwrap();
        b.add_node("fallback", NodeType::Clarification, json!({})).unwrap();
        b.add_edge("a", "fallback", Some("error")).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let dag = b.build(false).unwrap();
        let mut ctx = Context::new();
        let options = RunDagOptions::new(resolver()).max_steps(0);
        let err = run_dag(&dag, &mut ctx, &json!("hi"), &options).await.unwrap_err();
        assert!(matches!(err, GraphError::TraversalLimit { .. }));
    }
}

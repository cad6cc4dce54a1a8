//! Static validation of a built [`IntentDAG`]: id integrity, entrypoints,
//! acyclicity, reachability, and label coverage.
//!
//! Called automatically from [`crate::builder::GraphBuilder::build`] (unless
//! `validate = false`). Hard errors (id integrity, empty entrypoints,
//! cycles) abort the build; reachability and label-coverage problems are
//! reported as [`ValidationIssue::Warning`] and do not prevent the DAG from
//! being built.

use crate::error::{GraphError, Result};
use crate::graph::IntentDAG;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One issue surfaced by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A condition spec.md marks as a hard error; never actually returned
    /// from `validate` since hard errors short-circuit as `Err` instead.
    Error(String),
    /// A non-fatal observation (unreachable node, missing label coverage).
    Warning(String),
}

/// Run all five validator checks against a built DAG.
///
/// `producer_labels` is the caller-supplied `id -> set<label>` map consulted
/// by the label-coverage check; pass an empty map to skip that check.
pub fn validate(
    dag: &IntentDAG,
    producer_labels: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    check_id_integrity(dag)?;
    check_entrypoints_nonempty(dag)?;
    check_acyclic(dag)?;
    issues.extend(check_reachability(dag));
    issues.extend(check_label_coverage(dag, producer_labels));

    Ok(issues)
}

fn check_id_integrity(dag: &IntentDAG) -> Result<()> {
    for src in dag.adj.keys() {
        if dag.node(src).is_none() {
            return Err(GraphError::Validation(format!(
                "adjacency references unknown source node '{src}'"
            )));
        }
    }
    for by_label in dag.adj.values() {
        for dsts in by_label.values() {
            for dst in dsts {
                if dag.node(dst).is_none() {
                    return Err(GraphError::Validation(format!(
                        "edge target '{dst}' does not exist"
                    )));
                }
            }
        }
    }
    for entry in &dag.entrypoints {
        if dag.node(entry).is_none() {
            return Err(GraphError::Validation(format!(
                "entrypoint '{entry}' does not exist"
            )));
        }
    }
    // adj/rev mutual consistency.
    for (src, by_label) in &dag.adj {
        for dsts in by_label.values() {
            for dst in dsts {
                if !dag.rev.get(dst).map(|p| p.contains(src)).unwrap_or(false) {
                    return Err(GraphError::Validation(format!(
                        "adj/rev inconsistency: '{src}' -> '{dst}' missing from rev"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_entrypoints_nonempty(dag: &IntentDAG) -> Result<()> {
    if dag.entrypoints.is_empty() {
        return Err(GraphError::Validation("no entrypoints".to_string()));
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS cycle detection. Recovers the offending cycle as an
/// ordered node list (the repeated node appears at both ends) for the error
/// message.
fn check_acyclic(dag: &IntentDAG) -> Result<()> {
    let mut color: BTreeMap<&str, Color> = dag.node_ids().map(|id| (id.as_str(), Color::White)).collect();
    let mut stack: Vec<&str> = Vec::new();

    for start in dag.node_ids() {
        if color[start.as_str()] == Color::White {
            if let Some(cycle) = dfs_visit(dag, start, &mut color, &mut stack) {
                return Err(GraphError::Cycle { cycle });
            }
        }
    }
    Ok(())
}

fn dfs_visit<'a>(
    dag: &'a IntentDAG,
    node: &'a str,
    color: &mut BTreeMap<&'a str, Color>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    color.insert(node, Color::Gray);
    stack.push(node);

    if let Some(by_label) = dag.adj.get(node) {
        for dsts in by_label.values() {
            for dst in dsts {
                match color.get(dst.as_str()).copied() {
                    Some(Color::White) => {
                        if let Some(cycle) = dfs_visit(dag, dst.as_str(), color, stack) {
                            return Some(cycle);
                        }
                    }
                    Some(Color::Gray) => {
                        let mut cycle: Vec<String> = Vec::new();
                        if let Some(pos) = stack.iter().position(|n| n == dst) {
                            cycle.extend(stack[pos..].iter().map(|s| s.to_string()));
                        }
                        cycle.push(dst.clone());
                        return Some(cycle);
                    }
                    _ => {}
                }
            }
        }
    }

    stack.pop();
    color.insert(node, Color::Black);
    None
}

/// BFS from entrypoints; unreachable node ids are reported as warnings.
fn check_reachability(dag: &IntentDAG) -> Vec<ValidationIssue> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for e in &dag.entrypoints {
        if seen.insert(e.as_str()) {
            queue.push_back(e.as_str());
        }
    }

    while let Some(node) = queue.pop_front() {
        if let Some(by_label) = dag.adj.get(node) {
            for dsts in by_label.values() {
                for dst in dsts {
                    if seen.insert(dst.as_str()) {
                        queue.push_back(dst.as_str());
                    }
                }
            }
        }
    }

    dag.node_ids()
        .filter(|id| !seen.contains(id.as_str()))
        .map(|id| ValidationIssue::Warning(format!("node '{id}' is unreachable from any entrypoint")))
        .collect()
}

/// For each `(node, label)` the caller declares via `producer_labels`,
/// confirm either a matching labeled edge or a fall-through (`UNLABELED`)
/// edge exists at that node.
fn check_label_coverage(
    dag: &IntentDAG,
    producer_labels: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (node, labels) in producer_labels {
        let declared = dag.adj.get(node);
        for label in labels {
            let has_labeled = declared.map(|m| m.contains_key(label)).unwrap_or(false);
            let has_fallthrough = declared
                .map(|m| m.contains_key(crate::graph::UNLABELED))
                .unwrap_or(false);
            if !has_labeled && !has_fallthrough {
                issues.push(ValidationIssue::Warning(format!(
                    "node '{node}' may emit label '{label}' with no matching or fall-through edge"
                )));
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::NodeType;
    use serde_json::json;

    #[test]
    fn detects_self_loop_cycle() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Action, json!({})).unwrap();
        b.add_edge("a", "a", None).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let err = b.build(true).unwrap_err();
        match err {
            GraphError::Cycle { cycle } => assert_eq!(cycle, vec!["a".to_string(), "a".to_string()]),
            other => panic!("expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn warns_on_unreachable_node() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Clarification, json!({})).unwrap();
        b.add_node("orphan", NodeType::Clarification, json!({})).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let dag = b.build(false).unwrap();
        let issues = validate(&dag, &BTreeMap::new()).unwrap();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::Warning(m) if m.contains("orphan"))));
    }

    #[test]
    fn label_coverage_warns_when_missing() {
        let mut b = GraphBuilder::new();
        b.add_node("a", NodeType::Classifier, json!({})).unwrap();
        b.add_node("b", NodeType::Clarification, json!({})).unwrap();
        b.add_edge("a", "b", Some("greet")).unwrap();
        b.set_entrypoints(vec!["a".to_string()]).unwrap();
        let dag = b.build(false).unwrap();
        let mut producer_labels = BTreeMap::new();
        let mut labels = BTreeSet::new();
        labels.insert("farewell".to_string());
        producer_labels.insert("a".to_string(), labels);
        let issues = validate(&dag, &producer_labels).unwrap();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::Warning(m) if m.contains("farewell"))));
    }

    proptest::proptest! {
        /// For a linear chain of length `n` entered at its head, reachability
        /// covers every node and the validator raises no warnings — the
        /// `Reachable(entrypoints) = D.nodes` quantified invariant in
        /// spec.md §8, exercised over arbitrary chain lengths.
        #[test]
        fn linear_chain_is_fully_reachable(n in 1usize..20) {
            let mut b = GraphBuilder::new();
            for i in 0..n {
                b.add_node(format!("n{i}"), NodeType::Action, json!({})).unwrap();
            }
            for i in 0..n.saturating_sub(1) {
                b.add_edge(format!("n{i}"), format!("n{}", i + 1), None).unwrap();
            }
            b.set_entrypoints(vec!["n0".to_string()]).unwrap();
            let dag = b.build(false).unwrap();
            let issues = validate(&dag, &BTreeMap::new()).unwrap();
            proptest::prop_assert!(issues.is_empty());
        }
    }
}

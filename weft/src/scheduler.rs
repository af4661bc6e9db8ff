//! DAG validation and topological leveling.
//!
//! [`validate`] checks the structural rules; [`schedule`] runs Kahn-style
//! breadth-first leveling and returns the ordered levels, where every node
//! in level *i* has all of its dependencies in levels *< i*. Order within a
//! level preserves node insertion order for reproducibility; the executor
//! runs a whole level concurrently so within-level order is not observable.

use std::collections::{HashMap, HashSet};

use crate::error::AgentError;
use crate::workflow::AgentNode;

/// Validates the structural rules checked before leveling:
/// non-empty graph, pairwise-unique ids, known dependency targets, no
/// self-dependency, and at least one zero-in-degree node.
///
/// Cycle detection happens in [`schedule`]; a graph can pass `validate` and
/// still fail leveling when a cycle sits behind valid roots.
pub fn validate(nodes: &[AgentNode]) -> Result<(), AgentError> {
    if nodes.is_empty() {
        return Err(AgentError::InvalidWorkflow("Agent graph is empty".into()));
    }

    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(AgentError::InvalidWorkflow(format!(
                "Duplicate node id '{}'",
                node.id
            )));
        }
    }

    for node in nodes {
        for dep in &node.dependencies {
            if dep == &node.id {
                return Err(AgentError::InvalidWorkflow(format!(
                    "Circular dependency detected: node '{}' depends on itself",
                    node.id
                )));
            }
            if !ids.contains(dep.as_str()) {
                return Err(AgentError::InvalidWorkflow(format!(
                    "Node '{}' depends on unknown node '{}'",
                    node.id, dep
                )));
            }
        }
    }

    if !nodes.iter().any(|n| n.dependencies.is_empty()) {
        return Err(AgentError::InvalidWorkflow(
            "No entry node: every node has dependencies".into(),
        ));
    }

    Ok(())
}

/// Validates the graph and returns the execution levels.
///
/// Kahn-style breadth-first leveling: seed with all zero-in-degree nodes;
/// the whole current queue becomes one level, then successors whose
/// in-degree reaches zero form the next round's queue. If fewer nodes are
/// emitted than exist, the remainder sits on a cycle (or behind one).
pub fn schedule(nodes: &[AgentNode]) -> Result<Vec<Vec<String>>, AgentError> {
    validate(nodes)?;

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.dependencies.len()).collect();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for dep in &node.dependencies {
            successors[index[dep.as_str()]].push(i);
        }
    }

    let mut current: Vec<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut emitted = 0usize;

    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &succ in &successors[i] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    next.push(succ);
                }
            }
        }
        emitted += current.len();
        levels.push(current.iter().map(|&i| nodes[i].id.clone()).collect());
        next.sort_unstable();
        current = next;
    }

    if emitted < nodes.len() {
        return Err(AgentError::InvalidWorkflow(format!(
            "Circular dependency detected: {} node(s) unreachable from the entry nodes",
            nodes.len() - emitted
        )));
    }

    Ok(levels)
}

//! Per-workflow shared execution state.
//!
//! One [`ExecutionContext`] is created per workflow run and shared by every
//! node in it. Concurrent tables back the three maps (per-node state,
//! per-node output, shared values) so nodes in the same level can touch them
//! without coordination: outputs are single-writer per key, `vals` is
//! last-writer-wins, and node states are mutated only by the executor.
//! Cancellation is a latching token threaded down to every suspension point.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Success/failure tag on a node's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// Structured output of one node execution.
///
/// `summary` is the only channel downstream nodes see in their prompts;
/// it is non-empty on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub node_id: String,
    pub data: Value,
    pub summary: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub iterations: u32,
}

/// Per-node state machine record. Mutated only by the executor; observers
/// read clones through [`ExecutionContext::state`] or snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub node_id: String,
    pub status: NodeStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub result: Option<AgentExecutionResult>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl NodeState {
    fn pending(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            status: NodeStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            result: None,
            error: None,
            retry_count: 0,
        }
    }
}

/// Run status of the whole workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Serializable view of the context for observers. Clones everything; never
/// aliases live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub workflow_id: String,
    pub workflow_task: String,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    pub current_level: usize,
    pub nodes: Vec<NodeState>,
    pub outputs: HashMap<String, AgentExecutionResult>,
    pub value_keys: Vec<String>,
}

/// Shared state for one workflow run.
pub struct ExecutionContext {
    pub workflow_id: String,
    pub workflow_task: String,
    outputs: DashMap<String, AgentExecutionResult>,
    vals: DashMap<String, Value>,
    states: DashMap<String, NodeState>,
    status: RwLock<WorkflowStatus>,
    failure: RwLock<Option<String>>,
    current_level: AtomicUsize,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(workflow_id: impl Into<String>, workflow_task: impl Into<String>) -> Self {
        Self::with_cancellation(workflow_id, workflow_task, CancellationToken::new())
    }

    /// Context whose cancellation latches when either the given parent token
    /// or [`ExecutionContext::cancel`] fires.
    pub fn with_cancellation(
        workflow_id: impl Into<String>,
        workflow_task: impl Into<String>,
        parent: CancellationToken,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow_task: workflow_task.into(),
            outputs: DashMap::new(),
            vals: DashMap::new(),
            states: DashMap::new(),
            status: RwLock::new(WorkflowStatus::Running),
            failure: RwLock::new(None),
            current_level: AtomicUsize::new(0),
            started_at: Utc::now(),
            cancel: parent.child_token(),
        }
    }

    /// Returns the node's state, lazily creating a `pending` record.
    pub fn state(&self, node_id: &str) -> NodeState {
        self.states
            .entry(node_id.to_string())
            .or_insert_with(|| NodeState::pending(node_id))
            .clone()
    }

    /// Mutates the node's state in place (lazily created like [`Self::state`]).
    /// Executor-only; see the shared-resource policy in the crate docs.
    pub fn with_state<R>(&self, node_id: &str, f: impl FnOnce(&mut NodeState) -> R) -> R {
        let mut entry = self
            .states
            .entry(node_id.to_string())
            .or_insert_with(|| NodeState::pending(node_id));
        f(entry.value_mut())
    }

    /// Stores a node's output. Single-writer per key: a second write for the
    /// same node is ignored and logged.
    pub fn set_output(&self, result: AgentExecutionResult) -> bool {
        let node_id = result.node_id.clone();
        match self.outputs.entry(node_id) {
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(result);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(e) => {
                tracing::warn!(node_id = %e.key(), "output already set; ignoring second write");
                false
            }
        }
    }

    pub fn get_output(&self, node_id: &str) -> Option<AgentExecutionResult> {
        self.outputs.get(node_id).map(|r| r.clone())
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Writes a shared value. Last writer wins; no transactions.
    pub fn set_value(&self, key: impl Into<String>, value: Value) {
        self.vals.insert(key.into(), value);
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.vals.get(key).map(|v| v.clone())
    }

    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.vals.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn set_current_level(&self, level: usize) {
        self.current_level.store(level, Ordering::SeqCst);
    }

    pub fn current_level(&self) -> usize {
        self.current_level.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> WorkflowStatus {
        *self.status.read().expect("status lock")
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Reason recorded by [`Self::mark_failed`], if any.
    pub fn failure(&self) -> Option<String> {
        self.failure.read().expect("failure lock").clone()
    }

    fn transition(&self, to: WorkflowStatus) -> bool {
        let mut status = self.status.write().expect("status lock");
        if *status == WorkflowStatus::Running {
            *status = to;
            true
        } else {
            false
        }
    }

    /// Terminal transition to `completed`. No-op after any terminal state.
    pub fn mark_completed(&self) -> bool {
        self.transition(WorkflowStatus::Completed)
    }

    /// Terminal transition to `failed`, recording the reason.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        let moved = self.transition(WorkflowStatus::Failed);
        if moved {
            *self.failure.write().expect("failure lock") = Some(reason.into());
        }
        moved
    }

    /// Latches the cancellation signal. Idempotent; running nodes observe it
    /// at their next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.transition(WorkflowStatus::Cancelled);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token handed to agents, the LLM client, and tool executors.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Serializable view for observers; clones, never aliases.
    pub fn snapshot(&self) -> ContextSnapshot {
        let mut nodes: Vec<NodeState> = self.states.iter().map(|e| e.value().clone()).collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        ContextSnapshot {
            workflow_id: self.workflow_id.clone(),
            workflow_task: self.workflow_task.clone(),
            status: self.status(),
            started_at: self.started_at,
            current_level: self.current_level(),
            nodes,
            outputs: self
                .outputs
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            value_keys: self.list_keys(),
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("workflow_id", &self.workflow_id)
            .field("status", &self.status())
            .field("outputs", &self.outputs.len())
            .field("vals", &self.vals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(node_id: &str) -> AgentExecutionResult {
        AgentExecutionResult {
            node_id: node_id.to_string(),
            data: json!({"ok": true}),
            summary: "done".into(),
            status: ResultStatus::Success,
            error: None,
            duration_ms: 5,
            iterations: 1,
        }
    }

    /// **Scenario**: first access lazily creates a pending state; later access returns it.
    #[test]
    fn state_is_lazily_created_pending() {
        let ctx = ExecutionContext::new("w", "task");
        let s = ctx.state("a");
        assert_eq!(s.status, NodeStatus::Pending);
        assert_eq!(s.retry_count, 0);
        ctx.with_state("a", |s| s.retry_count = 2);
        assert_eq!(ctx.state("a").retry_count, 2);
    }

    /// **Scenario**: set_value / get_value round-trip; list_keys is sorted.
    #[test]
    fn values_roundtrip() {
        let ctx = ExecutionContext::new("w", "task");
        ctx.set_value("beta", json!(2));
        ctx.set_value("alpha", json!({"x": 1}));
        assert_eq!(ctx.get_value("alpha"), Some(json!({"x": 1})));
        assert_eq!(ctx.get_value("missing"), None);
        assert_eq!(ctx.list_keys(), ["alpha", "beta"]);
        // Last writer wins.
        ctx.set_value("alpha", json!("new"));
        assert_eq!(ctx.get_value("alpha"), Some(json!("new")));
    }

    /// **Scenario**: outputs are write-once per node.
    #[test]
    fn output_written_at_most_once() {
        let ctx = ExecutionContext::new("w", "task");
        assert!(ctx.set_output(result("a")));
        let mut second = result("a");
        second.summary = "other".into();
        assert!(!ctx.set_output(second));
        assert_eq!(ctx.get_output("a").unwrap().summary, "done");
        assert_eq!(ctx.output_count(), 1);
    }

    /// **Scenario**: cancel latches; a second call is a no-op and is_cancelled stays true.
    #[test]
    fn cancel_latches() {
        let ctx = ExecutionContext::new("w", "task");
        assert!(!ctx.is_cancelled());
        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.status(), WorkflowStatus::Cancelled);
        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.status(), WorkflowStatus::Cancelled);
    }

    /// **Scenario**: exactly one terminal transition wins.
    #[test]
    fn single_terminal_transition() {
        let ctx = ExecutionContext::new("w", "task");
        assert!(ctx.mark_completed());
        assert!(!ctx.mark_failed("late"));
        assert_eq!(ctx.status(), WorkflowStatus::Completed);
        assert_eq!(ctx.failure(), None);

        let ctx = ExecutionContext::new("w", "task");
        assert!(ctx.mark_failed("boom"));
        assert!(!ctx.mark_completed());
        assert_eq!(ctx.status(), WorkflowStatus::Failed);
        assert_eq!(ctx.failure().as_deref(), Some("boom"));
    }

    /// **Scenario**: a parent token cancels the context from outside.
    #[test]
    fn parent_token_propagates() {
        let parent = CancellationToken::new();
        let ctx = ExecutionContext::with_cancellation("w", "task", parent.clone());
        assert!(!ctx.is_cancelled());
        parent.cancel();
        assert!(ctx.is_cancelled());
    }

    /// **Scenario**: a snapshot does not alias live state — later writes are invisible.
    #[test]
    fn snapshot_does_not_alias() {
        let ctx = ExecutionContext::new("w", "task");
        ctx.set_value("k", json!(1));
        ctx.set_output(result("a"));
        let snap = ctx.snapshot();
        ctx.set_value("k2", json!(2));
        ctx.with_state("a", |s| s.status = NodeStatus::Running);
        assert_eq!(snap.value_keys, ["k"]);
        assert_eq!(snap.outputs.len(), 1);
        assert!(snap.nodes.iter().all(|n| n.status != NodeStatus::Running));
        // Snapshot serializes cleanly.
        let _ = serde_json::to_string(&snap).unwrap();
    }
}

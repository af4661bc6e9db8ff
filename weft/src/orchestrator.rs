//! Top-level façade: agent registration, workflow execution, result assembly.
//!
//! `execute` sequences validate → level → create context → run levels →
//! finalize. The event pipeline is assembled here: the caller's sink and the
//! progress tracker sit behind a fan-out, stamped with `timestamp`/`seq` at
//! the outermost layer so every subscriber sees one consistent order.

use std::sync::Arc;
use std::time::Instant;

use event_wire::{EventSink, NullSink, WorkflowEvent};
use serde_json::Value;
use uuid::Uuid;

use crate::agent::{AgentRegistry, BaseAgent};
use crate::config::ExecuteOptions;
use crate::context::{
    AgentExecutionResult, ContextSnapshot, ExecutionContext, NodeStatus, NodeState,
};
use crate::error::AgentError;
use crate::events::{FanoutSink, StampSink};
use crate::executor::WorkflowExecutor;
use crate::progress::{ProgressMetrics, ProgressTracker};
use crate::scheduler;
use crate::workflow::Workflow;

/// Final status of one workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Every node completed.
    Completed,
    /// At least one node completed and at least one failed, under
    /// `continue_on_error`.
    Partial,
    Failed,
}

/// Result record assembled after a run.
#[derive(Debug, Clone)]
pub struct WorkflowExecutionResult {
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    pub success_count: usize,
    pub failure_count: usize,
    /// Per-node outputs keyed by node id.
    pub outputs: std::collections::HashMap<String, AgentExecutionResult>,
    /// Per-node status snapshots, one per workflow node.
    pub node_states: Vec<NodeState>,
    /// Serializable context view (shared store keys included).
    pub context: ContextSnapshot,
    /// Accumulated event log from the run's tracker.
    pub events: Vec<Value>,
    pub metrics: ProgressMetrics,
    /// First unrecovered error, when the run aborted.
    pub error: Option<String>,
}

/// Registers named agents and drives workflow executions.
#[derive(Default)]
pub struct Orchestrator {
    registry: AgentRegistry,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent; duplicate ids overwrite.
    pub fn register_agent(&mut self, agent: BaseAgent) {
        self.registry.register(agent);
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Executes a workflow to completion.
    ///
    /// Validation failures return `Err` before any agent runs; runtime node
    /// failures are reported through the returned record's status.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        options: ExecuteOptions,
    ) -> Result<WorkflowExecutionResult, AgentError> {
        let levels = scheduler::schedule(&workflow.nodes)?;

        let workflow_id = if workflow.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            workflow.id.clone()
        };

        let ctx = Arc::new(match &options.cancellation {
            Some(parent) => ExecutionContext::with_cancellation(
                workflow_id.clone(),
                workflow.task(),
                parent.clone(),
            ),
            None => ExecutionContext::new(workflow_id.clone(), workflow.task()),
        });

        let tracker = Arc::new(ProgressTracker::new());
        let total_steps: usize = workflow.nodes.iter().map(|n| n.steps.len()).sum();
        tracker.begin(workflow.nodes.len(), total_steps, levels.len());

        let subscriber: Arc<dyn EventSink> = options
            .sink
            .clone()
            .unwrap_or_else(|| Arc::new(NullSink));
        let fanout: Arc<dyn EventSink> = Arc::new(FanoutSink::new(vec![
            subscriber,
            Arc::clone(&tracker) as Arc<dyn EventSink>,
        ]));
        let sink: Arc<dyn EventSink> = Arc::new(StampSink::new(fanout));

        let started = Instant::now();
        sink.emit(
            WorkflowEvent::Start {
                workflow_id: workflow_id.clone(),
            }
            .to_value(),
        );

        // The workflow-wide deadline behaves like a cancellation.
        let watchdog = options.timeout.map(|deadline| {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!("workflow timeout reached, cancelling");
                ctx.cancel();
            })
        });

        let executor = WorkflowExecutor::new(&self.registry, &options);
        let run_result = executor
            .run(workflow, &levels, &ctx, &sink, &tracker)
            .await;

        if let Some(handle) = watchdog {
            handle.abort();
        }
        let duration_ms = started.elapsed().as_millis() as u64;

        // Materialize a state for nodes the run never reached.
        for node in &workflow.nodes {
            let _ = ctx.state(&node.id);
        }

        let snapshot = ctx.snapshot();
        let success_count = snapshot
            .nodes
            .iter()
            .filter(|s| s.status == NodeStatus::Completed)
            .count();
        let failure_count = snapshot
            .nodes
            .iter()
            .filter(|s| s.status == NodeStatus::Failed)
            .count();

        let status = if success_count == workflow.nodes.len() {
            ExecutionStatus::Completed
        } else if options.continue_on_error && success_count > 0 && failure_count > 0 {
            ExecutionStatus::Partial
        } else {
            ExecutionStatus::Failed
        };

        let error = match &run_result {
            Ok(()) => None,
            Err(e) => Some(e.to_string()),
        };

        match status {
            ExecutionStatus::Completed | ExecutionStatus::Partial => {
                ctx.mark_completed();
                sink.emit(
                    WorkflowEvent::Complete {
                        workflow_id: workflow_id.clone(),
                        duration_ms,
                    }
                    .to_value(),
                );
            }
            ExecutionStatus::Failed => {
                let reason = error
                    .clone()
                    .unwrap_or_else(|| "one or more nodes failed".to_string());
                ctx.mark_failed(reason.clone());
                sink.emit(
                    WorkflowEvent::Error {
                        workflow_id: workflow_id.clone(),
                        error: reason,
                    }
                    .to_value(),
                );
            }
        }

        // Snapshot again so the result reflects the terminal status.
        let context = ctx.snapshot();
        Ok(WorkflowExecutionResult {
            workflow_id,
            status,
            duration_ms,
            success_count,
            failure_count,
            outputs: context.outputs.clone(),
            node_states: context.nodes.clone(),
            context,
            events: tracker.events(),
            metrics: tracker.metrics(),
            error,
        })
    }
}

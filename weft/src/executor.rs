//! Workflow executor: level-by-level concurrent node fan-out.
//!
//! For each level the executor checks cancellation, dispatches every node
//! concurrently (optionally bounded by a semaphore), and awaits the whole
//! level before advancing — the strict happens-before between levels.
//! Per-node work wraps the agent invocation in a deadline, orchestrates
//! retries for transiently failing nodes, and owns every mutation of the
//! per-node state machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use event_wire::{AgentEvent, EventSink, WorkflowEvent};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::agent::{AgentRegistry, AgentRunOptions};
use crate::config::ExecuteOptions;
use crate::context::{ExecutionContext, NodeStatus};
use crate::error::AgentError;
use crate::events::NodeScopeSink;
use crate::progress::ProgressTracker;
use crate::retry::RetryPolicy;
use crate::workflow::{AgentNode, Workflow};

/// Runs scheduled levels against a registry. Borrowed per execution; the
/// orchestrator owns the long-lived pieces.
pub struct WorkflowExecutor<'a> {
    registry: &'a AgentRegistry,
    options: &'a ExecuteOptions,
}

impl<'a> WorkflowExecutor<'a> {
    pub fn new(registry: &'a AgentRegistry, options: &'a ExecuteOptions) -> Self {
        Self { registry, options }
    }

    /// Executes every level in order. Returns the first unrecovered node
    /// error unless `continue_on_error` swallows it.
    pub async fn run(
        &self,
        workflow: &Workflow,
        levels: &[Vec<String>],
        ctx: &Arc<ExecutionContext>,
        sink: &Arc<dyn EventSink>,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<(), AgentError> {
        let nodes_by_id: HashMap<&str, &AgentNode> = workflow
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();
        let semaphore = self
            .options
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        for (level_index, level) in levels.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            ctx.set_current_level(level_index);
            sink.emit(
                WorkflowEvent::LevelStart {
                    level: level_index,
                    agent_count: level.len(),
                }
                .to_value(),
            );
            debug!(level = level_index, nodes = level.len(), "level start");

            let runs = level.iter().filter_map(|node_id| {
                nodes_by_id
                    .get(node_id.as_str())
                    .map(|node| self.run_node(node, workflow, ctx, sink, tracker, semaphore.clone()))
            });
            let results = futures::future::join_all(runs).await;

            sink.emit(WorkflowEvent::LevelComplete { level: level_index }.to_value());

            if !self.options.continue_on_error {
                if let Some(err) = results.into_iter().find_map(Result::err) {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// One node: resolve → run under deadline → record, retrying transient
    /// failures under the retry cap.
    async fn run_node(
        &self,
        node: &AgentNode,
        workflow: &Workflow,
        ctx: &Arc<ExecutionContext>,
        sink: &Arc<dyn EventSink>,
        tracker: &Arc<ProgressTracker>,
        semaphore: Option<Arc<Semaphore>>,
    ) -> Result<(), AgentError> {
        let _permit = match semaphore {
            Some(s) => s.acquire_owned().await.ok(),
            None => None,
        };

        let node_sink: Arc<dyn EventSink> =
            Arc::new(NodeScopeSink::new(Arc::clone(sink), &node.id));
        let run_options = AgentRunOptions {
            max_iterations: self.options.max_iterations,
            streaming: self.options.enable_streaming,
            compression: self.options.compression.clone(),
            on_text: self.options.on_text.clone(),
        };
        let policy = RetryPolicy::with_max_retries(self.options.max_retries);
        let mut attempt: u32 = 0;

        loop {
            if ctx.is_cancelled() {
                ctx.with_state(&node.id, |s| {
                    s.status = NodeStatus::Failed;
                    s.finished_at = Some(Utc::now());
                    s.error = Some(AgentError::Cancelled.to_string());
                });
                tracker.node_finished(0, true);
                return Err(AgentError::Cancelled);
            }

            let Some(agent) = self.registry.resolve(&node.agent_type) else {
                let err = AgentError::AgentNotFound(node.agent_type.clone());
                ctx.with_state(&node.id, |s| {
                    s.status = NodeStatus::Failed;
                    s.finished_at = Some(Utc::now());
                    s.error = Some(err.to_string());
                });
                node_sink.emit(
                    AgentEvent::Error {
                        agent_id: node.agent_type.clone(),
                        node: node.id.clone(),
                        error: err.to_string(),
                    }
                    .to_value(),
                );
                tracker.node_finished(0, true);
                return Err(err);
            };

            let started = Instant::now();
            ctx.with_state(&node.id, |s| {
                s.status = NodeStatus::Running;
                s.started_at = Some(Utc::now());
                s.finished_at = None;
                s.duration_ms = None;
            });

            let attempt_outcome = tokio::time::timeout(
                self.options.agent_timeout,
                agent.run(node, workflow.task(), ctx, &run_options, &node_sink),
            )
            .await;

            let failure = match attempt_outcome {
                Ok(Ok(result)) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    ctx.with_state(&node.id, |s| {
                        s.status = NodeStatus::Completed;
                        s.finished_at = Some(Utc::now());
                        s.duration_ms = Some(duration_ms);
                        s.result = Some(result.clone());
                        s.error = None;
                    });
                    ctx.set_output(result);
                    tracker.node_finished(duration_ms, false);
                    return Ok(());
                }
                Ok(Err(err)) => err,
                Err(_elapsed) => {
                    // The invocation future was dropped at the deadline, so
                    // the agent never got to emit its own error event.
                    let err = AgentError::Timeout(self.options.agent_timeout);
                    node_sink.emit(
                        AgentEvent::Error {
                            agent_id: agent.definition().id.clone(),
                            node: node.id.clone(),
                            error: err.to_string(),
                        }
                        .to_value(),
                    );
                    err
                }
            };

            let duration_ms = started.elapsed().as_millis() as u64;
            warn!(node = %node.id, attempt, error = %failure, "node failed");
            ctx.with_state(&node.id, |s| {
                s.status = NodeStatus::Failed;
                s.finished_at = Some(Utc::now());
                s.duration_ms = Some(duration_ms);
                s.error = Some(failure.to_string());
            });

            // Cancellation and deadline expiry are fatal to the node; only
            // classifier-retryable failures re-invoke, and only under the cap.
            let fatal = matches!(failure, AgentError::Timeout(_) | AgentError::Cancelled);
            if !fatal
                && failure.class().retryable
                && attempt < self.options.max_retries
                && !ctx.is_cancelled()
            {
                attempt += 1;
                ctx.with_state(&node.id, |s| {
                    s.status = NodeStatus::Pending;
                    s.retry_count = attempt;
                });
                node_sink.emit(AgentEvent::Retry { attempt }.to_value());
                tokio::time::sleep(policy.delay(attempt)).await;
                continue;
            }

            tracker.node_finished(duration_ms, true);
            return Err(failure);
        }
    }
}

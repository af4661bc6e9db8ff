//! Integration tests: failure handling — validation, retries, timeouts,
//! cancellation, and the continue-on-error policy.


use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use weft::{
    AgentDefinition, AgentError, AgentNode, BaseAgent, CollectSink, EventSink, ExecuteOptions,
    ExecutionStatus, LlmResponse, MockLlm, MockToolSource, NodeStatus, Orchestrator,
    Workflow, WorkflowStatus,
};

fn worker(id: &str, llm: Arc<MockLlm>) -> BaseAgent {
    BaseAgent::new(
        AgentDefinition::new(id, id, "Test worker."),
        llm,
        Arc::new(MockToolSource::new(vec![], json!("ok"))),
    )
}

fn single_node_workflow(agent_type: &str) -> Workflow {
    Workflow::new(
        "wf",
        "single",
        "one node",
        vec![AgentNode::new("only", agent_type, "Only", "do it")],
    )
}

/// A cyclic graph is rejected before any agent runs.
#[tokio::test]
async fn cycle_rejected_before_execution() {
    let llm = Arc::new(MockLlm::new("never"));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm.clone()));

    let workflow = Workflow::new(
        "wf-cycle",
        "cycle",
        "impossible",
        vec![
            AgentNode::new("a", "worker", "A", "a").with_dependencies(vec!["b".into()]),
            AgentNode::new("b", "worker", "B", "b").with_dependencies(vec!["a".into()]),
        ],
    );

    let err = orchestrator
        .execute(&workflow, ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidWorkflow(_)));
    assert!(err.to_string().starts_with("Invalid workflow:"));
    assert_eq!(llm.calls(), 0);
}

/// No registered agent matches the node type: the node fails with
/// agent-not-found and the workflow fails.
#[tokio::test]
async fn unresolved_agent_type_fails_node() {
    let orchestrator = Orchestrator::new();
    let result = orchestrator
        .execute(&single_node_workflow("ghost"), ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("no agent found"));
    let state = &result.node_states[0];
    assert_eq!(state.status, NodeStatus::Failed);
    assert!(state.error.as_deref().unwrap().contains("ghost"));
}

/// Transient network failure retries under the cap: agent:error, then
/// agent:retry{attempt: 1}, then agent:complete; the node records one retry.
#[tokio::test(start_paused = true)]
async fn transient_network_error_retries_then_completes() {
    let llm = Arc::new(
        MockLlm::new("unused")
            .then_error("connect ECONNREFUSED 127.0.0.1:443")
            .then_reply(LlmResponse::text("second attempt worked")),
    );
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm.clone()));

    let sink = Arc::new(CollectSink::new());
    let options = ExecuteOptions {
        max_retries: 2,
        sink: Some(sink.clone() as Arc<dyn EventSink>),
        ..Default::default()
    };
    let result = orchestrator
        .execute(&single_node_workflow("worker"), options)
        .await
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.node_states[0].retry_count, 1);
    assert_eq!(llm.calls(), 2);

    let types: Vec<String> = sink
        .events()
        .iter()
        .filter_map(|e| e["type"].as_str().map(str::to_string))
        .collect();
    let error = types.iter().position(|t| t == "agent:error").unwrap();
    let retry = types.iter().position(|t| t == "agent:retry").unwrap();
    let complete = types.iter().position(|t| t == "agent:complete").unwrap();
    assert!(error < retry && retry < complete);

    let retry_event = sink
        .events()
        .into_iter()
        .find(|e| e["type"] == "agent:retry")
        .unwrap();
    assert_eq!(retry_event["attempt"], 1);
    assert_eq!(retry_event["nodeId"], "only");
}

/// A non-retryable failure is not retried even with retries configured.
#[tokio::test]
async fn non_retryable_failure_does_not_retry() {
    let llm = Arc::new(MockLlm::new("unused").then_error("runtime error: bad state"));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm.clone()));

    let options = ExecuteOptions {
        max_retries: 3,
        ..Default::default()
    };
    let result = orchestrator
        .execute(&single_node_workflow("worker"), options)
        .await
        .unwrap();
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.node_states[0].retry_count, 0);
    assert_eq!(llm.calls(), 1);
}

/// continue_on_error: one root fails for good, the other completes; the run
/// reports partial and both states are recorded.
#[tokio::test]
async fn continue_on_error_yields_partial() {
    let good = Arc::new(MockLlm::new("fine"));
    let bad = Arc::new(MockLlm::new("unused").then_error("runtime error: boom"));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("good-agent", good));
    orchestrator.register_agent(worker("bad-agent", bad));

    let workflow = Workflow::new(
        "wf-partial",
        "partial",
        "two roots",
        vec![
            AgentNode::new("ok", "good", "Ok", "works"),
            AgentNode::new("broken", "bad", "Broken", "fails"),
        ],
    );

    let options = ExecuteOptions {
        continue_on_error: true,
        ..Default::default()
    };
    let result = orchestrator.execute(&workflow, options).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Partial);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);
    assert!(result.outputs.contains_key("ok"));
    assert!(!result.outputs.contains_key("broken"));
    // A partial run still finishes the whole level; no abort error.
    assert!(result.error.is_none());
}

/// Per-node timeout: the deadline fails the node and is never retried.
#[tokio::test(start_paused = true)]
async fn node_timeout_is_fatal() {
    let llm = Arc::new(MockLlm::new("unused").then_delayed_reply(
        Duration::from_secs(60),
        LlmResponse::text("too late"),
    ));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm.clone()));

    let sink = Arc::new(CollectSink::new());
    let options = ExecuteOptions {
        agent_timeout: Duration::from_millis(100),
        max_retries: 3,
        sink: Some(sink.clone() as Arc<dyn EventSink>),
        ..Default::default()
    };
    let result = orchestrator
        .execute(&single_node_workflow("worker"), options)
        .await
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    let state = &result.node_states[0];
    assert_eq!(state.status, NodeStatus::Failed);
    assert!(state.error.as_deref().unwrap().contains("timeout"));
    assert_eq!(state.retry_count, 0);
    assert_eq!(llm.calls(), 1);
    assert!(!sink
        .events()
        .iter()
        .any(|e| e["type"] == "agent:retry"));
}

/// External cancellation: running nodes observe the latched signal at their
/// next suspension point and the workflow fails.
#[tokio::test(start_paused = true)]
async fn cancellation_stops_running_nodes() {
    let llm = Arc::new(MockLlm::new("unused").then_delayed_reply(
        Duration::from_secs(60),
        LlmResponse::text("never delivered"),
    ));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm));

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let options = ExecuteOptions {
        cancellation: Some(token),
        ..Default::default()
    };
    let result = orchestrator
        .execute(&single_node_workflow("worker"), options)
        .await
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.context.status, WorkflowStatus::Cancelled);
    let state = &result.node_states[0];
    assert_eq!(state.status, NodeStatus::Failed);
    assert!(state.error.as_deref().unwrap().contains("cancelled"));
    assert!(result.error.as_deref().unwrap().contains("cancelled"));
}

/// The workflow-wide timeout behaves like a cancellation.
#[tokio::test(start_paused = true)]
async fn workflow_timeout_cancels() {
    let llm = Arc::new(MockLlm::new("unused").then_delayed_reply(
        Duration::from_secs(60),
        LlmResponse::text("never delivered"),
    ));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm));

    let options = ExecuteOptions {
        timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let result = orchestrator
        .execute(&single_node_workflow("worker"), options)
        .await
        .unwrap();
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.context.status, WorkflowStatus::Cancelled);
}

/// max_concurrency = 1 serializes a level but still completes it.
#[tokio::test]
async fn bounded_concurrency_still_completes() {
    let llm = Arc::new(MockLlm::new("done"));
    let mut orchestrator = Orchestrator::new();
    orchestrator.register_agent(worker("worker-agent", llm));

    let workflow = Workflow::new(
        "wf-bounded",
        "bounded",
        "three roots",
        vec![
            AgentNode::new("x", "worker", "X", "x"),
            AgentNode::new("y", "worker", "Y", "y"),
            AgentNode::new("z", "worker", "Z", "z"),
        ],
    );

    let options = ExecuteOptions {
        max_concurrency: Some(1),
        ..Default::default()
    };
    let result = orchestrator.execute(&workflow, options).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.success_count, 3);
}

//! # Weft
//!
//! A multi-agent workflow orchestrator: submit a DAG of agent nodes, and
//! weft schedules them into parallel levels, drives each node through a
//! reason–act loop against an LLM with tool dispatch, and surfaces a stream
//! of lifecycle events to observers.
//!
//! ## Design principles
//!
//! - **Levels, not locks**: the scheduler turns the DAG into levels; a whole
//!   level runs concurrently and no node starts before its dependencies'
//!   level finished. Nodes share state only through the
//!   [`ExecutionContext`].
//! - **Summaries travel, data is stored**: a node's prompt sees only its
//!   parents' result summaries; structured payloads cross nodes through the
//!   reserved `valSet`/`valGet`/`valList` tools.
//! - **Sinks, not listeners**: events flow into an [`EventSink`] passed down
//!   the call chain, decorated at each layer (`react:*` → `agent:*` +
//!   `agentId`, then `nodeId`, then `timestamp`/`seq`), which keeps each
//!   subscriber's ordering consistent with the run.
//! - **External collaborators stay external**: the LLM transport and
//!   concrete tools are behind [`LlmClient`] and [`ToolSource`]; the crate
//!   ships scripted mocks ([`MockLlm`], [`MockToolSource`]) for tests.
//!
//! ## Main modules
//!
//! - [`workflow`] / [`scheduler`]: [`Workflow`], [`AgentNode`]; validation
//!   and Kahn-style topological leveling.
//! - [`context`]: [`ExecutionContext`] — per-node states, write-once
//!   outputs, last-writer-wins shared values, latched cancellation.
//! - [`react`]: [`ReactRunner`] — the per-invocation reason–act loop.
//! - [`agent`]: [`AgentDefinition`], [`BaseAgent`], [`AgentRegistry`],
//!   prompt assembly.
//! - [`executor`]: [`WorkflowExecutor`] — level fan-out, per-node deadlines,
//!   retries.
//! - [`orchestrator`]: [`Orchestrator`] — registration, execution,
//!   [`WorkflowExecutionResult`].
//! - [`compress`]: [`ContextManager`] — history ceilings, pair-safe
//!   truncation, LLM summarization, context-length recovery.
//! - [`progress`]: [`ProgressTracker`] — bounded event log and metrics.
//! - [`error`] / [`retry`]: classification table and exponential backoff.
//! - [`llm`] / [`tool_source`]: the pinned external interfaces.
//!
//! Event wire types live in the `event-wire` crate and are re-exported here.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use weft::{
//!     AgentDefinition, AgentNode, BaseAgent, ExecuteOptions, MockLlm,
//!     MockToolSource, Orchestrator, Workflow,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), weft::AgentError> {
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.register_agent(BaseAgent::new(
//!     AgentDefinition::new("research-agent", "Researcher", "Finds sources."),
//!     Arc::new(MockLlm::new("done")),
//!     Arc::new(MockToolSource::new(vec![], json!("ok"))),
//! ));
//!
//! let workflow = Workflow::new(
//!     "wf-1",
//!     "survey",
//!     "Write a short survey",
//!     vec![
//!         AgentNode::new("gather", "research", "Gather", "collect sources"),
//!         AgentNode::new("write", "research", "Write", "draft the survey")
//!             .with_dependencies(vec!["gather".into()]),
//!     ],
//! );
//!
//! let result = orchestrator.execute(&workflow, ExecuteOptions::default()).await?;
//! println!("{:?} in {}ms", result.status, result.duration_ms);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod compress;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod llm;
pub mod message;
pub mod orchestrator;
pub mod progress;
pub mod react;
pub mod retry;
pub mod scheduler;
pub mod tool_source;
pub mod workflow;

pub use agent::{
    build_initial_user_message, build_system_prompt, AgentDefinition, AgentRegistry,
    AgentRunOptions, BaseAgent,
};
pub use compress::{estimate_tokens, CompressionConfig, ContextManager};
pub use config::ExecuteOptions;
pub use context::{
    AgentExecutionResult, ContextSnapshot, ExecutionContext, NodeState, NodeStatus, ResultStatus,
    WorkflowStatus,
};
pub use error::{classify, AgentError, ErrorClass, ErrorKind, Severity};
pub use events::{AgentScopeSink, FanoutSink, NodeScopeSink, StampSink};
pub use executor::WorkflowExecutor;
pub use llm::{LlmClient, LlmRequest, LlmResponse, LlmStreamEvent, LlmUsage, MockLlm};
pub use message::{Message, ToolCall};
pub use orchestrator::{ExecutionStatus, Orchestrator, WorkflowExecutionResult};
pub use progress::{ProgressMetrics, ProgressTracker};
pub use react::{LoopOutcome, ReactOptions, ReactRunner, TextCallback};
pub use retry::RetryPolicy;
pub use scheduler::{schedule, validate};
pub use tool_source::{
    CompositeToolSource, ContextToolSource, MockToolSource, ToolReturn, ToolSource,
    ToolSourceError, ToolSpec, CONTEXT_TOOL_NAMES, FINAL_RESULT_KEY, TOOL_VAL_GET, TOOL_VAL_LIST,
    TOOL_VAL_SET,
};
pub use workflow::{AgentNode, NodeStep, Workflow};

// Event wire re-exports so downstream crates need only `weft`.
pub use event_wire::{
    AgentEvent, CollectSink, EventSink, FnSink, LoopEvent, NullSink, WorkflowEvent,
};

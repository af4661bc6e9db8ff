//! Agents: declared identity plus a tool set, executed through the ReAct loop.
//!
//! An agent is data, not subclassing: [`AgentDefinition`] names it and
//! [`BaseAgent`] composes the LLM handle with the agent's [`ToolSource`].
//! At run time the agent merges its tools with the reserved context tools,
//! builds the prompts from node metadata, drives the loop, and re-emits loop
//! events under the `agent:*` namespace with its id attached.

pub mod prompt;
pub mod registry;

pub use prompt::{build_initial_user_message, build_system_prompt};
pub use registry::AgentRegistry;

use std::sync::Arc;
use std::time::Instant;

use event_wire::{AgentEvent, EventSink};

use crate::compress::{CompressionConfig, ContextManager};
use crate::context::{AgentExecutionResult, ExecutionContext, ResultStatus};
use crate::error::AgentError;
use crate::events::AgentScopeSink;
use crate::llm::LlmClient;
use crate::react::{ReactOptions, ReactRunner, TextCallback};
use crate::tool_source::{CompositeToolSource, ContextToolSource, ToolSource, CONTEXT_TOOL_NAMES};
use crate::workflow::AgentNode;

/// Declared identity of an agent: how the registry addresses it and how it
/// introduces itself in prompts.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    /// Registry id; node `type` tags resolve against this (and `name`).
    pub id: String,
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
}

impl AgentDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            capabilities: vec![],
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Per-run options handed down by the executor.
#[derive(Clone)]
pub struct AgentRunOptions {
    pub max_iterations: u32,
    pub streaming: bool,
    pub compression: CompressionConfig,
    pub on_text: Option<TextCallback>,
}

impl Default for AgentRunOptions {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            streaming: true,
            compression: CompressionConfig::default(),
            on_text: None,
        }
    }
}

impl std::fmt::Debug for AgentRunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunOptions")
            .field("max_iterations", &self.max_iterations)
            .field("streaming", &self.streaming)
            .field("compression", &self.compression)
            .field("on_text", &self.on_text.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// An executable agent: identity + LLM handle + declared tool set.
///
/// Concrete agents are values of this type with different tool sources;
/// the registry stores them behind `Arc` and one agent may serve many nodes.
pub struct BaseAgent {
    definition: AgentDefinition,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
}

impl BaseAgent {
    pub fn new(
        definition: AgentDefinition,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
    ) -> Self {
        Self {
            definition,
            llm,
            tools,
        }
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    /// Runs one node through the ReAct loop.
    ///
    /// Emits `agent:start` before the loop and `agent:complete` /
    /// `agent:error` after, with the measured duration and iteration count.
    /// All loop events pass through an [`AgentScopeSink`] so subscribers see
    /// them as `agent:*` with this agent's id.
    pub async fn run(
        &self,
        node: &AgentNode,
        workflow_task: &str,
        ctx: &Arc<ExecutionContext>,
        options: &AgentRunOptions,
        sink: &Arc<dyn EventSink>,
    ) -> Result<AgentExecutionResult, AgentError> {
        let started = Instant::now();
        let scoped: Arc<dyn EventSink> =
            Arc::new(AgentScopeSink::new(Arc::clone(sink), &self.definition.id));

        scoped.emit(
            AgentEvent::Start {
                agent_id: self.definition.id.clone(),
                node: node.id.clone(),
            }
            .to_value(),
        );

        let context_tools = Arc::new(ContextToolSource::new(Arc::clone(ctx)));
        let tools: Arc<dyn ToolSource> = Arc::new(CompositeToolSource::new(
            context_tools,
            CONTEXT_TOOL_NAMES,
            Arc::clone(&self.tools),
        ));

        let tool_names: Vec<String> = match tools.list_tools().await {
            Ok(specs) => specs.into_iter().map(|spec| spec.name).collect(),
            Err(e) => {
                let err = AgentError::ExecutionFailed(e.to_string());
                scoped.emit(
                    AgentEvent::Error {
                        agent_id: self.definition.id.clone(),
                        node: node.id.clone(),
                        error: err.to_string(),
                    }
                    .to_value(),
                );
                return Err(err);
            }
        };

        let system_prompt =
            build_system_prompt(&self.definition, node, workflow_task, &tool_names);
        let user_message = build_initial_user_message(node, ctx);

        let runner = ReactRunner::new(
            Arc::clone(&self.llm),
            tools,
            ContextManager::new(options.compression.clone(), Arc::clone(&self.llm)),
            ReactOptions {
                max_iterations: options.max_iterations,
                streaming: options.streaming,
            },
            Arc::clone(&scoped),
            ctx.cancellation_token(),
            options.on_text.clone(),
        );

        match runner.run(&system_prompt, &user_message).await {
            Ok(outcome) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                scoped.emit(
                    AgentEvent::Complete {
                        agent_id: self.definition.id.clone(),
                        node: node.id.clone(),
                        duration_ms,
                        iterations: outcome.iterations,
                    }
                    .to_value(),
                );
                Ok(AgentExecutionResult {
                    node_id: node.id.clone(),
                    data: outcome.data,
                    summary: outcome.summary,
                    status: ResultStatus::Success,
                    error: None,
                    duration_ms,
                    iterations: outcome.iterations,
                })
            }
            Err(err) => {
                scoped.emit(
                    AgentEvent::Error {
                        agent_id: self.definition.id.clone(),
                        node: node.id.clone(),
                        error: err.to_string(),
                    }
                    .to_value(),
                );
                Err(err)
            }
        }
    }
}

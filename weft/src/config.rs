//! Execution options recognized by the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use event_wire::EventSink;
use tokio_util::sync::CancellationToken;

use crate::compress::CompressionConfig;
use crate::react::TextCallback;

/// Options for one workflow execution.
#[derive(Clone)]
pub struct ExecuteOptions {
    /// Workflow-wide wall-clock ceiling; behaves like a cancellation.
    pub timeout: Option<Duration>,
    /// Per-node deadline enforced by the executor.
    pub agent_timeout: Duration,
    /// Executor-level retry cap for failed nodes.
    pub max_retries: u32,
    /// When true, a node failure does not abort the workflow.
    pub continue_on_error: bool,
    /// Caps concurrent node executions within a level; unbounded if absent.
    pub max_concurrency: Option<usize>,
    /// Per-agent ReAct iteration cap.
    pub max_iterations: u32,
    pub compression: CompressionConfig,
    pub enable_streaming: bool,
    /// Caller-owned token; cancelling it cancels the workflow.
    pub cancellation: Option<CancellationToken>,
    /// Subscriber for the event stream.
    pub sink: Option<Arc<dyn EventSink>>,
    /// Per-chunk text callback for streamed assistant output.
    pub on_text: Option<TextCallback>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            agent_timeout: Duration::from_secs(300),
            max_retries: 0,
            continue_on_error: false,
            max_concurrency: None,
            max_iterations: 30,
            compression: CompressionConfig::default(),
            enable_streaming: true,
            cancellation: None,
            sink: None,
            on_text: None,
        }
    }
}

impl std::fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("timeout", &self.timeout)
            .field("agent_timeout", &self.agent_timeout)
            .field("max_retries", &self.max_retries)
            .field("continue_on_error", &self.continue_on_error)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_iterations", &self.max_iterations)
            .field("compression", &self.compression)
            .field("enable_streaming", &self.enable_streaming)
            .field("cancellation", &self.cancellation.is_some())
            .field("sink", &self.sink.is_some())
            .field("on_text", &self.on_text.is_some())
            .finish()
    }
}

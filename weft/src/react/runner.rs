//! ReactRunner: the loop body, streaming consumption, and recovery paths.

use std::sync::Arc;

use event_wire::{EventSink, LoopEvent};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::compress::ContextManager;
use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse, LlmStreamEvent};
use crate::message::{Message, ToolCall};
use crate::tool_source::ToolSource;

/// Per-chunk text callback for streaming consumers.
pub type TextCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Loop options.
#[derive(Clone, Debug)]
pub struct ReactOptions {
    /// Iteration cap; reaching it ends the loop with a canned result.
    pub max_iterations: u32,
    /// Whether LLM calls stream text deltas.
    pub streaming: bool,
}

impl Default for ReactOptions {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            streaming: true,
        }
    }
}

/// Outcome of one loop invocation.
#[derive(Clone, Debug)]
pub struct LoopOutcome {
    /// Structured payload: the sentinel value, or `{"response": text}`.
    pub data: Value,
    /// Human-readable short text; the only channel downstream prompts see.
    pub summary: String,
    pub finish_reason: String,
    pub iterations: u32,
}

/// One reason–act driver wired to an LLM, a tool source, a context manager,
/// an event sink, and a cancellation token.
pub struct ReactRunner {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
    context_manager: ContextManager,
    options: ReactOptions,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    on_text: Option<TextCallback>,
}

impl ReactRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
        context_manager: ContextManager,
        options: ReactOptions,
        sink: Arc<dyn EventSink>,
        cancel: CancellationToken,
        on_text: Option<TextCallback>,
    ) -> Self {
        Self {
            llm,
            tools,
            context_manager,
            options,
            sink,
            cancel,
            on_text,
        }
    }

    fn emit(&self, event: LoopEvent) {
        self.sink.emit(event.to_value());
    }

    /// Drives the loop to completion. History is seeded with one user
    /// message and owned by this call.
    pub async fn run(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<LoopOutcome, AgentError> {
        let tools = self
            .tools
            .list_tools()
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
        let request = LlmRequest {
            system_prompt: system_prompt.to_string(),
            tools,
        };

        let mut history = vec![Message::user(user_message)];
        let mut iteration: u32 = 0;

        while iteration < self.options.max_iterations {
            iteration += 1;
            self.emit(LoopEvent::Thinking {
                iteration,
                history_length: history.len(),
            });

            if let Some(compressed) = self
                .context_manager
                .manage_context(&history, iteration)
                .await?
            {
                history = compressed;
                self.emit(LoopEvent::Compressed {
                    after_count: history.len(),
                    iteration,
                });
            }

            let response = self.call_llm(&mut history, &request, iteration).await?;
            let tool_calls: Vec<ToolCall> = response
                .tool_calls
                .into_iter()
                .map(ToolCall::normalized)
                .collect();

            if tool_calls.is_empty() {
                let content = response.content;
                history.push(Message::assistant(content.clone()));
                if !content.is_empty() {
                    return Ok(LoopOutcome {
                        data: json!({"response": content.clone()}),
                        summary: content,
                        finish_reason: response.finish_reason,
                        iterations: iteration,
                    });
                }
                self.emit(LoopEvent::Warning {
                    message: format!(
                        "no tool calls and no text response (finish reason: {})",
                        response.finish_reason
                    ),
                    iteration,
                });
                return Ok(LoopOutcome {
                    data: json!({"response": ""}),
                    summary: String::new(),
                    finish_reason: response.finish_reason,
                    iterations: iteration,
                });
            }

            history.push(Message::assistant_with_calls(
                response.content,
                tool_calls.clone(),
            ));

            let total_calls = tool_calls.len();
            for tc in &tool_calls {
                self.emit(LoopEvent::Action {
                    tool_call_id: tc.id.clone(),
                    tool_name: tc.name.clone(),
                    input: tc.input.clone(),
                    iteration,
                    total_calls,
                });
                debug!(tool = %tc.name, call_id = %tc.id, "dispatching tool");

                let dispatched = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(AgentError::Cancelled),
                    result = self.tools.call_tool(&tc.name, tc.input.clone()) => result,
                };

                match dispatched {
                    Ok(ret) if ret.is_final() => {
                        self.emit(LoopEvent::Observation {
                            tool_call_id: tc.id.clone(),
                            tool_name: tc.name.clone(),
                            result: ret.value().clone(),
                            iteration,
                            is_final: Some(true),
                        });
                        return Ok(LoopOutcome {
                            data: ret.into_value(),
                            summary: format!(
                                "Task completed: {} generated final result",
                                tc.name
                            ),
                            finish_reason: "stop".into(),
                            iterations: iteration,
                        });
                    }
                    Ok(ret) => {
                        self.emit(LoopEvent::Observation {
                            tool_call_id: tc.id.clone(),
                            tool_name: tc.name.clone(),
                            result: ret.value().clone(),
                            iteration,
                            is_final: None,
                        });
                        history.push(Message::tool_result(
                            tc.id.clone(),
                            render_result(ret.value()),
                        ));
                    }
                    Err(e) => {
                        // A failed call does not abort the batch; the error
                        // goes back to the LLM as an error-tagged result.
                        warn!(tool = %tc.name, error = %e, "tool call failed");
                        self.emit(LoopEvent::ObservationError {
                            tool_call_id: tc.id.clone(),
                            tool_name: tc.name.clone(),
                            error: e.to_string(),
                            iteration,
                        });
                        history.push(Message::tool_error(tc.id.clone(), e.to_string()));
                    }
                }
            }
        }

        self.emit(LoopEvent::MaxIterations {
            max_iterations: self.options.max_iterations,
        });
        Ok(LoopOutcome {
            data: json!({"response": "Max iterations reached"}),
            summary: "Task completed with max iterations".into(),
            finish_reason: "max-iterations".into(),
            iterations: self.options.max_iterations,
        })
    }

    /// One LLM turn, streaming when enabled, with the one-shot
    /// context-length recovery: emit the event, compress aggressively,
    /// replace the history, retry once non-streaming. A second failure
    /// propagates.
    async fn call_llm(
        &self,
        history: &mut Vec<Message>,
        request: &LlmRequest,
        iteration: u32,
    ) -> Result<LlmResponse, AgentError> {
        let first = if self.options.streaming {
            self.call_streaming(history, request, iteration).await
        } else {
            self.call_plain(history, request).await
        };

        match first {
            Err(AgentError::ExecutionFailed(message))
                if self.context_manager.is_context_length_error(&message) =>
            {
                self.emit(LoopEvent::ContextLengthError {
                    error: message,
                    history_length: history.len(),
                });
                *history = self
                    .context_manager
                    .handle_context_length_error(history)
                    .await?;
                self.call_plain(history, request).await
            }
            other => other,
        }
    }

    async fn call_plain(
        &self,
        history: &[Message],
        request: &LlmRequest,
    ) -> Result<LlmResponse, AgentError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            response = self.llm.invoke(history, request) => response,
        }
    }

    async fn call_streaming(
        &self,
        history: &[Message],
        request: &LlmRequest,
        iteration: u32,
    ) -> Result<LlmResponse, AgentError> {
        let (tx, mut rx) = mpsc::channel::<LlmStreamEvent>(64);

        let forward = async {
            while let Some(event) = rx.recv().await {
                match event {
                    LlmStreamEvent::TextDelta { text } => {
                        self.emit(LoopEvent::StreamText {
                            text_delta: text.clone(),
                            iteration,
                        });
                        if let Some(cb) = &self.on_text {
                            cb(&text);
                        }
                    }
                    // The returned response carries the authoritative
                    // tool-call list; stream copies are presentation-only.
                    LlmStreamEvent::ToolCall(_) => {}
                    LlmStreamEvent::Finish {
                        finish_reason,
                        usage,
                    } => {
                        self.emit(LoopEvent::StreamFinish {
                            finish_reason,
                            usage: usage.and_then(|u| serde_json::to_value(u).ok()),
                            iteration,
                        });
                    }
                }
            }
        };

        let invoke = self.llm.invoke_stream(history, request, Some(tx));
        let joined = async {
            let (response, ()) = tokio::join!(invoke, forward);
            response
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            response = joined => response,
        }
    }
}

/// Tool results enter history as text; strings stay bare, everything else
/// is compact JSON.
fn render_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! LLM client abstraction for the ReAct loop.
//!
//! The loop depends on a callable that, given the conversation history plus
//! a per-run request (system prompt and tool roster), returns assistant text
//! and tool calls; this module defines the trait and the scripted mock used
//! by tests.
//!
//! # Streaming
//!
//! `invoke_stream()` accepts an optional `Sender<LlmStreamEvent>`; streaming
//! implementations send text deltas, complete tool calls, and a final
//! `Finish` through the channel as they arrive, and still return the
//! complete [`LlmResponse`] at the end. The loop treats the returned
//! response as authoritative and the channel as presentation-only, so
//! non-streaming implementations can keep the default passthrough.

mod mock;

pub use mock::MockLlm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::message::{Message, ToolCall};
use crate::tool_source::ToolSpec;

/// Token usage for one LLM call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Per-run request context sent with every call: the system prompt and the
/// tool roster. Kept outside the history so compression can never drop it.
#[derive(Clone, Debug)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub tools: Vec<ToolSpec>,
}

/// Response from one LLM call: assistant text, tool calls in model order,
/// the model-reported finish reason, and usage when the provider returns it.
#[derive(Clone, Debug)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: String,
    pub usage: Option<LlmUsage>,
}

impl LlmResponse {
    /// Text-only response with the default "stop" finish reason.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
            finish_reason: "stop".into(),
            usage: None,
        }
    }

    /// Response carrying tool calls.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: "tool-calls".into(),
            usage: None,
        }
    }
}

/// One event on the streaming channel.
#[derive(Clone, Debug)]
pub enum LlmStreamEvent {
    /// Incremental assistant text.
    TextDelta { text: String },
    /// A complete tool call assembled by the provider.
    ToolCall(ToolCall),
    /// Stream terminator with the finish reason and total usage.
    Finish {
        finish_reason: String,
        usage: Option<LlmUsage>,
    },
}

/// LLM client: history + request in, assistant text and tool calls out.
///
/// Errors surface as [`AgentError::ExecutionFailed`] carrying the provider
/// message; a context-window overflow must carry a message matchable by
/// [`crate::compress::ContextManager::is_context_length_error`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one turn without streaming.
    async fn invoke(
        &self,
        messages: &[Message],
        request: &LlmRequest,
    ) -> Result<LlmResponse, AgentError>;

    /// Streaming variant. When `chunk_tx` is `Some`, implementations send
    /// [`LlmStreamEvent`]s as they arrive and still return the complete
    /// response. The default calls `invoke()` and replays the result as one
    /// delta per kind plus a `Finish`.
    async fn invoke_stream(
        &self,
        messages: &[Message],
        request: &LlmRequest,
        chunk_tx: Option<mpsc::Sender<LlmStreamEvent>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages, request).await?;
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx
                    .send(LlmStreamEvent::TextDelta {
                        text: response.content.clone(),
                    })
                    .await;
            }
            for tc in &response.tool_calls {
                let _ = tx.send(LlmStreamEvent::ToolCall(tc.clone())).await;
            }
            let _ = tx
                .send(LlmStreamEvent::Finish {
                    finish_reason: response.finish_reason.clone(),
                    usage: response.usage.clone(),
                })
                .await;
        }
        Ok(response)
    }
}

//! Scripted mock LLM for tests and examples.
//!
//! Replies are queued ahead of time; each `invoke` pops the next entry.
//! Entries can be plain replies, injected errors (to exercise retry and
//! context-length recovery), or delayed replies (to exercise timeouts).
//! When the script runs dry the mock returns its fallback text with no tool
//! calls, so loops always terminate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse, LlmStreamEvent};
use crate::message::{Message, ToolCall};

enum Scripted {
    Reply(LlmResponse),
    Fail(String),
    DelayedReply { delay: Duration, reply: LlmResponse },
}

/// Mock LLM: scripted replies, injected failures, optional delays.
///
/// Shared across retries via `Arc`, so a script of `[error, reply]` drives a
/// fail-once-then-succeed node. `calls()` reports how many invocations
/// happened, which lets tests assert "no second LLM call was made".
pub struct MockLlm {
    script: Mutex<VecDeque<Scripted>>,
    fallback: String,
    calls: AtomicUsize,
}

impl MockLlm {
    /// Mock with an empty script; every call returns `fallback` with no tool calls.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock whose first reply is assistant text with no tool calls (END path).
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(content.clone()).then_reply(LlmResponse::text(content))
    }

    /// Mock whose first reply carries one tool call and whose second reply is
    /// plain text, driving one full reason–act round then termination.
    pub fn tool_round_then_text(
        tool: ToolCall,
        first_content: impl Into<String>,
        second_content: impl Into<String>,
    ) -> Self {
        let second = second_content.into();
        Self::new(second.clone())
            .then_reply(LlmResponse::with_tool_calls(first_content, vec![tool]))
            .then_reply(LlmResponse::text(second))
    }

    /// Queues a reply (builder).
    pub fn then_reply(self, reply: LlmResponse) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Reply(reply));
        self
    }

    /// Queues an error whose message the caller will classify (builder).
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Queues a reply delivered after `delay` (builder); for timeout tests.
    pub fn then_delayed_reply(self, delay: Duration, reply: LlmResponse) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::DelayedReply { delay, reply });
        self
    }

    /// Number of `invoke` calls so far (streaming included).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Option<Scripted> {
        self.script.lock().expect("mock script lock").pop_front()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        _messages: &[Message],
        _request: &LlmRequest,
    ) -> Result<LlmResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(AgentError::ExecutionFailed(message)),
            Some(Scripted::DelayedReply { delay, reply }) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            None => Ok(LlmResponse::text(self.fallback.clone())),
        }
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        request: &LlmRequest,
        chunk_tx: Option<mpsc::Sender<LlmStreamEvent>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages, request).await?;
        if let Some(tx) = chunk_tx {
            // Word-level chunks give stream consumers more than one delta to observe.
            for word in response.content.split_inclusive(' ') {
                let _ = tx
                    .send(LlmStreamEvent::TextDelta {
                        text: word.to_string(),
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

//! Conversation compression: bound history by message and token ceilings.
//!
//! [`ContextManager::manage_context`] runs at the top of every loop
//! iteration. When the history exceeds either ceiling, the most recent
//! messages are preserved verbatim (never splitting a tool-call/result
//! pair) and everything older is collapsed into one synthetic assistant
//! summary produced by a single LLM call. The manager also recognizes
//! model-side context-window errors and performs a harsher pass for
//! immediate retry.

mod config;
mod window;

pub use config::CompressionConfig;
pub use window::{estimate_tokens, preserved_suffix_start};

use std::sync::Arc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest};
use crate::message::Message;

/// Substrings that identify a model-reported context-window overflow.
const CONTEXT_LENGTH_PATTERNS: [&str; 5] = [
    "context length",
    "maximum context",
    "context window",
    "token limit",
    "too many tokens",
];

/// Cap on per-message characters fed to the summarizer (normal pass).
const SUMMARY_INPUT_CHARS: usize = 2000;
/// Harsher cap for the emergency pass.
const EMERGENCY_SUMMARY_INPUT_CHARS: usize = 500;

/// Bounds a conversation history; owns the ceilings and the summarizer LLM.
pub struct ContextManager {
    config: CompressionConfig,
    llm: Arc<dyn LlmClient>,
}

impl ContextManager {
    pub fn new(config: CompressionConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self { config, llm }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Returns `Some(shorter_history)` when compression applied, `None` when
    /// the history fits both ceilings (or compression is disabled).
    pub async fn manage_context(
        &self,
        history: &[Message],
        iteration: u32,
    ) -> Result<Option<Vec<Message>>, AgentError> {
        if !self.config.enabled {
            return Ok(None);
        }
        let tokens = estimate_tokens(history);
        if history.len() <= self.config.max_messages && tokens <= self.config.max_tokens {
            return Ok(None);
        }
        tracing::debug!(
            iteration,
            messages = history.len(),
            tokens,
            "history over ceiling, compressing"
        );
        // Leave room for the next reply: preserve half the message ceiling
        // and half the token ceiling verbatim.
        let keep = (self.config.max_messages / 2).max(1);
        let budget = self.config.max_tokens / 2;
        let compressed = self
            .compress(history, keep, budget, SUMMARY_INPUT_CHARS)
            .await?;
        if compressed.len() >= history.len() {
            return Ok(None);
        }
        Ok(Some(compressed))
    }

    /// True when the message names a model-side context-window overflow.
    pub fn is_context_length_error(&self, message: &str) -> bool {
        let m = message.to_lowercase();
        CONTEXT_LENGTH_PATTERNS.iter().any(|p| m.contains(p))
    }

    /// Aggressive compression for immediate retry after the model rejected
    /// the history outright: a much tighter suffix and harsher transcript
    /// caps for the summarizer input.
    pub async fn handle_context_length_error(
        &self,
        history: &[Message],
    ) -> Result<Vec<Message>, AgentError> {
        let keep = (self.config.max_messages / 8).max(2);
        let budget = self.config.max_tokens / 4;
        self.compress(history, keep, budget, EMERGENCY_SUMMARY_INPUT_CHARS)
            .await
    }

    async fn compress(
        &self,
        history: &[Message],
        keep_recent: usize,
        token_budget: u32,
        input_cap: usize,
    ) -> Result<Vec<Message>, AgentError> {
        let start = preserved_suffix_start(history, keep_recent, token_budget);
        if start == 0 {
            // Nothing old enough to collapse; hand back a copy unchanged.
            return Ok(history.to_vec());
        }
        let (older, recent) = history.split_at(start);
        let summary = self.summarize(older, input_cap).await?;
        let mut out = Vec::with_capacity(recent.len() + 1);
        out.push(Message::assistant(format!(
            "[Conversation summary] {summary}"
        )));
        out.extend(recent.iter().cloned());
        Ok(out)
    }

    /// One LLM call over the collapsed region. The prompt pins what must
    /// survive: the original task, which tools were called with what, and
    /// what they returned.
    async fn summarize(&self, older: &[Message], input_cap: usize) -> Result<String, AgentError> {
        let prompt = build_summary_prompt(older, input_cap);
        let request = LlmRequest {
            system_prompt: String::new(),
            tools: vec![],
        };
        let response = self.llm.invoke(&[Message::user(prompt)], &request).await?;
        Ok(response.content)
    }
}

fn truncate(s: &str, cap: usize) -> &str {
    if s.len() <= cap {
        return s;
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn build_summary_prompt(messages: &[Message], input_cap: usize) -> String {
    let mut parts = vec![
        "Summarize the following conversation into a compact briefing. Preserve:".to_string(),
        "- The original user task, verbatim if short".to_string(),
        "- Every tool that was called, with its salient arguments".to_string(),
        "- The outcome of each tool call (or its error)".to_string(),
        String::new(),
    ];
    for m in messages {
        match m {
            Message::User { content } => parts.push(format!("User: {}", truncate(content, input_cap))),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                if !content.is_empty() {
                    parts.push(format!("Assistant: {}", truncate(content, input_cap)));
                }
                for tc in tool_calls {
                    parts.push(format!(
                        "Assistant called {}({})",
                        tc.name,
                        truncate(&tc.input.to_string(), input_cap)
                    ));
                }
            }
            Message::ToolResult {
                call_id,
                content,
                is_error,
            } => {
                let tag = if *is_error { "failed with" } else { "returned" };
                parts.push(format!(
                    "Tool call {call_id} {tag}: {}",
                    truncate(content, input_cap)
                ));
            }
        }
    }
    parts.join("\n")
}

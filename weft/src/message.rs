//! Conversation message and tool-call types for the ReAct loop.
//!
//! A history is a sequence of [`Message`]s owned by one loop invocation:
//! the seed user message, assistant turns (text and/or tool calls), and one
//! tool result per tool call, keyed by call id. The context manager may
//! replace a history wholesale; messages themselves are immutable values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tool invocation produced by the LLM.
///
/// `input` is the decoded JSON arguments. Older SDK shapes that send the
/// arguments under `args`, or as a JSON-encoded string, are accepted and
/// normalized by serde alias plus [`ToolCall::normalized`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id; unique within one conversation history. Each id is later
    /// referenced by exactly one tool-result message.
    pub id: String,
    /// Tool name as listed by the tool source.
    pub name: String,
    /// Decoded JSON arguments.
    #[serde(alias = "args")]
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Returns the call with string-encoded JSON arguments re-parsed.
    ///
    /// Some providers double-encode arguments (`"{\"k\":1}"`); the loop
    /// dispatches on the decoded object either way.
    pub fn normalized(mut self) -> Self {
        if let Value::String(s) = &self.input {
            if let Ok(parsed) = serde_json::from_str::<Value>(s) {
                self.input = parsed;
            }
        }
        self
    }
}

/// One message in a loop invocation's conversation history.
///
/// There is no System variant: the system prompt travels alongside the
/// history in every LLM request rather than inside it, so compression can
/// never drop it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum Message {
    /// User input (the seed task message).
    User { content: String },
    /// Model turn: text and the tool calls it requested, in returned order.
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool call, keyed by the originating call id.
    ToolResult {
        call_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Creates a text-only assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: vec![],
        }
    }

    /// Creates an assistant message carrying tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Creates a successful tool-result message.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error-tagged tool-result message.
    pub fn tool_error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Approximate character length, counting tool-call arguments. Input to
    /// the token heuristic in [`crate::compress`].
    pub fn approx_chars(&self) -> usize {
        match self {
            Message::User { content } => content.len(),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                content.len()
                    + tool_calls
                        .iter()
                        .map(|tc| tc.name.len() + tc.input.to_string().len())
                        .sum::<usize>()
            }
            Message::ToolResult { content, .. } => content.len(),
        }
    }

    /// Ids of the tool calls this message carries (empty for non-assistant).
    pub fn tool_call_ids(&self) -> Vec<&str> {
        match self {
            Message::Assistant { tool_calls, .. } => {
                tool_calls.iter().map(|tc| tc.id.as_str()).collect()
            }
            _ => vec![],
        }
    }

    /// The call id this message answers, when it is a tool result.
    pub fn answered_call_id(&self) -> Option<&str> {
        match self {
            Message::ToolResult { call_id, .. } => Some(call_id.as_str()),
            _ => None,
        }
    }
}

//! Typed event payloads with their fixed wire `type` strings.
//!
//! Payload-carrying fields that come from the core (tool inputs, results,
//! usage) use `serde_json::Value`; weft serializes its own types into that.

use serde::Serialize;
use serde_json::Value;

/// One event emitted from inside a ReAct loop invocation (`react:*` scope).
///
/// The agent layer rewrites these into the `agent:*` namespace via
/// [`crate::scope::agent_scope`]; they are never delivered to subscribers
/// under the raw `react:*` type unless the caller taps the innermost sink.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum LoopEvent {
    /// Start of one loop iteration, before the LLM call.
    #[serde(rename = "react:thinking")]
    Thinking { iteration: u32, history_length: usize },
    /// Conversation history was replaced by a compressed version.
    #[serde(rename = "react:compressed")]
    Compressed { after_count: usize, iteration: u32 },
    /// One tool call is about to be executed.
    #[serde(rename = "react:action")]
    Action {
        tool_call_id: String,
        tool_name: String,
        input: Value,
        iteration: u32,
        total_calls: usize,
    },
    /// A tool call returned a value.
    #[serde(rename = "react:observation")]
    Observation {
        tool_call_id: String,
        tool_name: String,
        result: Value,
        iteration: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_final: Option<bool>,
    },
    /// A tool call failed; the error is fed back to the LLM and the batch continues.
    #[serde(rename = "react:observation-error")]
    ObservationError {
        tool_call_id: String,
        tool_name: String,
        error: String,
        iteration: u32,
    },
    /// Incremental text from a streaming LLM call.
    #[serde(rename = "react:stream-text")]
    StreamText { text_delta: String, iteration: u32 },
    /// A streaming LLM call finished.
    #[serde(rename = "react:stream-finish")]
    StreamFinish {
        finish_reason: String,
        usage: Option<Value>,
        iteration: u32,
    },
    /// The LLM reported a context-window overflow; emergency compression follows.
    #[serde(rename = "react:context-length-error")]
    ContextLengthError { error: String, history_length: usize },
    /// The LLM returned neither text nor tool calls.
    #[serde(rename = "react:warning")]
    Warning { message: String, iteration: u32 },
    /// The iteration cap was reached without a terminal response.
    #[serde(rename = "react:max-iterations")]
    MaxIterations { max_iterations: u32 },
}

/// Agent lifecycle events (`agent:start` / `agent:complete` / `agent:error` /
/// `agent:retry`). Emitted by the agent layer and the executor; re-tagged
/// loop events share the `agent:*` namespace but are produced via
/// [`crate::scope::agent_scope`], not this enum.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum AgentEvent {
    #[serde(rename = "agent:start")]
    Start { agent_id: String, node: String },
    #[serde(rename = "agent:complete")]
    Complete {
        agent_id: String,
        node: String,
        duration_ms: u64,
        iterations: u32,
    },
    #[serde(rename = "agent:error")]
    Error {
        agent_id: String,
        node: String,
        error: String,
    },
    /// Emitted by the executor before re-invoking a retryable failed node.
    #[serde(rename = "agent:retry")]
    Retry { attempt: u32 },
}

/// Workflow-level events: run and level lifecycle.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WorkflowEvent {
    #[serde(rename = "workflow:start")]
    Start { workflow_id: String },
    #[serde(rename = "workflow:complete")]
    Complete { workflow_id: String, duration_ms: u64 },
    #[serde(rename = "workflow:error")]
    Error { workflow_id: String, error: String },
    #[serde(rename = "level:start")]
    LevelStart { level: usize, agent_count: usize },
    #[serde(rename = "level:complete")]
    LevelComplete { level: usize },
}

impl LoopEvent {
    /// Serializes this event to a JSON object (type + payload only).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl AgentEvent {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl WorkflowEvent {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: each enum serializes with its fixed `type` string and camelCase payload keys.
    #[test]
    fn event_type_strings_are_fixed() {
        let v = LoopEvent::Thinking {
            iteration: 1,
            history_length: 3,
        }
        .to_value();
        assert_eq!(v["type"], "react:thinking");
        assert_eq!(v["iteration"], 1);
        assert_eq!(v["historyLength"], 3);

        let v = AgentEvent::Retry { attempt: 2 }.to_value();
        assert_eq!(v["type"], "agent:retry");
        assert_eq!(v["attempt"], 2);

        let v = WorkflowEvent::LevelStart {
            level: 0,
            agent_count: 2,
        }
        .to_value();
        assert_eq!(v["type"], "level:start");
        assert_eq!(v["agentCount"], 2);
    }

    /// **Scenario**: optional observation `isFinal` is omitted when None and present when set.
    #[test]
    fn observation_is_final_omitted_when_none() {
        let v = LoopEvent::Observation {
            tool_call_id: "c1".into(),
            tool_name: "t".into(),
            result: serde_json::json!({"ok": true}),
            iteration: 1,
            is_final: None,
        }
        .to_value();
        assert!(v.get("isFinal").is_none());

        let v = LoopEvent::Observation {
            tool_call_id: "c1".into(),
            tool_name: "t".into(),
            result: Value::Null,
            iteration: 1,
            is_final: Some(true),
        }
        .to_value();
        assert_eq!(v["isFinal"], true);
    }
}

//! Tool source abstraction: list tools and call a tool.
//!
//! The ReAct loop depends on `ToolSource` instead of a concrete tool
//! registry; implementations here are `MockToolSource` (tests),
//! `ContextToolSource` (the reserved data-sharing tools), and
//! `CompositeToolSource` (an agent's own tools merged with the reserved
//! ones). Concrete browser/shell/file tools live outside the core; only
//! this interface is pinned.
//!
//! A tool answers with [`ToolReturn`]: either a value the loop feeds back to
//! the LLM, or a final result that terminates the loop immediately. The
//! legacy `__final_result__` magic key is honored when decoding arbitrary
//! payloads.

mod composite;
mod context_tools;
mod mock;

pub use composite::CompositeToolSource;
pub use context_tools::{ContextToolSource, CONTEXT_TOOL_NAMES, TOOL_VAL_GET, TOOL_VAL_LIST, TOOL_VAL_SET};
pub use mock::MockToolSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// In-band sentinel key: a structured tool payload with a truthy value under
/// this key terminates the loop with the remaining fields as the result.
pub const FINAL_RESULT_KEY: &str = "__final_result__";

/// Tool specification: name, description for the LLM, JSON Schema for input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Errors from listing or calling tools.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// Result of one tool call: keep looping, or terminate with a final value.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReturn {
    /// Ordinary observation; fed back to the LLM as a tool result.
    Continue(Value),
    /// Terminal result; the loop exits immediately with this value.
    Final(Value),
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl ToolReturn {
    /// Decodes an arbitrary payload, honoring the magic-key convention: an
    /// object with a truthy [`FINAL_RESULT_KEY`] becomes `Final` with the
    /// key stripped; everything else is `Continue`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => match map.remove(FINAL_RESULT_KEY) {
                Some(flag) if is_truthy(&flag) => ToolReturn::Final(Value::Object(map)),
                Some(flag) => {
                    // Falsey sentinel: restore the key, the payload is ordinary data.
                    map.insert(FINAL_RESULT_KEY.to_string(), flag);
                    ToolReturn::Continue(Value::Object(map))
                }
                None => ToolReturn::Continue(Value::Object(map)),
            },
            other => ToolReturn::Continue(other),
        }
    }

    /// The carried value, for either variant.
    pub fn value(&self) -> &Value {
        match self {
            ToolReturn::Continue(v) | ToolReturn::Final(v) => v,
        }
    }

    /// Consumes the return and yields the carried value.
    pub fn into_value(self) -> Value {
        match self {
            ToolReturn::Continue(v) | ToolReturn::Final(v) => v,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ToolReturn::Final(_))
    }
}

/// Tool source: list tools and call a tool.
///
/// The loop uses `list_tools()` to build the LLM request and `call_tool`
/// to dispatch each returned tool call, in order.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// List available tools.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Call a tool by name with JSON arguments.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolReturn, ToolSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: a truthy sentinel is stripped and terminates; a falsey one is plain data.
    #[test]
    fn tool_return_decodes_sentinel() {
        let ret = ToolReturn::from_value(json!({"__final_result__": true, "report": "r"}));
        assert!(ret.is_final());
        assert_eq!(ret.value(), &json!({"report": "r"}));

        let ret = ToolReturn::from_value(json!({"__final_result__": false, "report": "r"}));
        assert!(!ret.is_final());
        assert_eq!(
            ret.value(),
            &json!({"__final_result__": false, "report": "r"})
        );

        let ret = ToolReturn::from_value(json!({"__final_result__": "yes", "x": 1}));
        assert!(ret.is_final());

        let ret = ToolReturn::from_value(json!("plain text"));
        assert!(!ret.is_final());
    }

    /// **Scenario**: Display of each error variant carries its keyword.
    #[test]
    fn tool_source_error_display() {
        assert!(ToolSourceError::NotFound("x".into())
            .to_string()
            .contains("not found"));
        assert!(ToolSourceError::InvalidInput("bad".into())
            .to_string()
            .contains("invalid"));
        assert!(ToolSourceError::Execution("boom".into())
            .to_string()
            .contains("failed"));
    }

    /// **Scenario**: ToolSpec round-trips through serde.
    #[test]
    fn tool_spec_serde_roundtrip() {
        let spec = ToolSpec {
            name: "lookup".into(),
            description: Some("Look something up.".into()),
            input_schema: json!({"type": "object", "properties": {"q": {"type": "string"}}}),
        };
        let s = serde_json::to_string(&spec).unwrap();
        let back: ToolSpec = serde_json::from_str(&s).unwrap();
        assert_eq!(back.name, "lookup");
    }
}

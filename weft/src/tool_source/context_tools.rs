//! Reserved data-sharing tools bridging an agent to the shared value store.
//!
//! Exposes `valSet` / `valGet` / `valList` over [`ExecutionContext::vals`]
//! so agents can pass structured data across nodes without going through
//! prompts. The names are reserved: when an agent declares a tool with the
//! same name, the context tool wins (see
//! [`crate::tool_source::CompositeToolSource`]).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;

use super::{ToolReturn, ToolSource, ToolSourceError, ToolSpec};

/// Tool name: write a value to the shared store.
pub const TOOL_VAL_SET: &str = "valSet";
/// Tool name: read a value from the shared store.
pub const TOOL_VAL_GET: &str = "valGet";
/// Tool name: list keys in the shared store.
pub const TOOL_VAL_LIST: &str = "valList";

/// All reserved context-tool names.
pub const CONTEXT_TOOL_NAMES: [&str; 3] = [TOOL_VAL_SET, TOOL_VAL_GET, TOOL_VAL_LIST];

/// Tool source closed over the current run's [`ExecutionContext`].
pub struct ContextToolSource {
    ctx: Arc<ExecutionContext>,
}

impl ContextToolSource {
    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }

    fn require_key(arguments: &Value) -> Result<String, ToolSourceError> {
        arguments
            .get("key")
            .and_then(|k| k.as_str())
            .map(str::to_string)
            .ok_or_else(|| ToolSourceError::InvalidInput("missing string field 'key'".into()))
    }
}

#[async_trait]
impl ToolSource for ContextToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(vec![
            ToolSpec {
                name: TOOL_VAL_SET.into(),
                description: Some(
                    "Store a value under a key in the shared workflow store so later agents can read it.".into(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "key": {"type": "string"},
                        "value": {}
                    },
                    "required": ["key", "value"]
                }),
            },
            ToolSpec {
                name: TOOL_VAL_GET.into(),
                description: Some("Read a value by key from the shared workflow store.".into()),
                input_schema: json!({
                    "type": "object",
                    "properties": {"key": {"type": "string"}},
                    "required": ["key"]
                }),
            },
            ToolSpec {
                name: TOOL_VAL_LIST.into(),
                description: Some("List all keys in the shared workflow store.".into()),
                input_schema: json!({"type": "object", "properties": {}}),
            },
        ])
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolReturn, ToolSourceError> {
        match name {
            TOOL_VAL_SET => {
                let key = Self::require_key(&arguments)?;
                let value = arguments.get("value").cloned().unwrap_or(Value::Null);
                tracing::debug!(key = %key, "valSet");
                self.ctx.set_value(key, value);
                Ok(ToolReturn::Continue(json!({"ok": true})))
            }
            TOOL_VAL_GET => {
                let key = Self::require_key(&arguments)?;
                let value = self.ctx.get_value(&key).unwrap_or(Value::Null);
                Ok(ToolReturn::Continue(json!({"value": value})))
            }
            TOOL_VAL_LIST => Ok(ToolReturn::Continue(json!({"keys": self.ctx.list_keys()}))),
            other => Err(ToolSourceError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: valSet writes through to the context; valGet and valList read back.
    #[tokio::test]
    async fn val_tools_bridge_to_context() {
        let ctx = Arc::new(ExecutionContext::new("w", "task"));
        let tools = ContextToolSource::new(Arc::clone(&ctx));

        let r = tools
            .call_tool(TOOL_VAL_SET, json!({"key": "plan", "value": {"steps": 3}}))
            .await
            .unwrap();
        assert_eq!(r.value(), &json!({"ok": true}));
        assert_eq!(ctx.get_value("plan"), Some(json!({"steps": 3})));

        let r = tools
            .call_tool(TOOL_VAL_GET, json!({"key": "plan"}))
            .await
            .unwrap();
        assert_eq!(r.value(), &json!({"value": {"steps": 3}}));

        let r = tools
            .call_tool(TOOL_VAL_GET, json!({"key": "missing"}))
            .await
            .unwrap();
        assert_eq!(r.value(), &json!({"value": null}));

        let r = tools.call_tool(TOOL_VAL_LIST, json!({})).await.unwrap();
        assert_eq!(r.value(), &json!({"keys": ["plan"]}));
    }

    /// **Scenario**: a missing key argument is an invalid-input error; unknown names are not found.
    #[tokio::test]
    async fn val_tools_validate_arguments() {
        let ctx = Arc::new(ExecutionContext::new("w", "task"));
        let tools = ContextToolSource::new(ctx);
        let err = tools.call_tool(TOOL_VAL_SET, json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
        let err = tools.call_tool("other", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
    }

    /// **Scenario**: the advertised tool list carries all three reserved names.
    #[tokio::test]
    async fn lists_reserved_tools() {
        let ctx = Arc::new(ExecutionContext::new("w", "task"));
        let tools = ContextToolSource::new(ctx);
        let specs = tools.list_tools().await.unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, CONTEXT_TOOL_NAMES);
    }
}

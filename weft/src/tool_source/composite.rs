//! Composite tool source: reserved tools merged over an agent's own tools.
//!
//! Dispatch routes a reserved name to the reserved source and everything
//! else to the base source; the listing hides base tools shadowed by a
//! reserved name, so the LLM only ever sees the winning definition.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ToolReturn, ToolSource, ToolSourceError, ToolSpec};

/// Two-layer tool source with reserved-name precedence.
pub struct CompositeToolSource {
    reserved: Arc<dyn ToolSource>,
    reserved_names: Vec<String>,
    base: Arc<dyn ToolSource>,
}

impl CompositeToolSource {
    pub fn new(
        reserved: Arc<dyn ToolSource>,
        reserved_names: impl IntoIterator<Item = impl Into<String>>,
        base: Arc<dyn ToolSource>,
    ) -> Self {
        Self {
            reserved,
            reserved_names: reserved_names.into_iter().map(Into::into).collect(),
            base,
        }
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|n| n == name)
    }
}

#[async_trait]
impl ToolSource for CompositeToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let mut specs = self.reserved.list_tools().await?;
        for spec in self.base.list_tools().await? {
            if self.is_reserved(&spec.name) {
                tracing::warn!(tool = %spec.name, "agent tool shadowed by reserved context tool");
                continue;
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolReturn, ToolSourceError> {
        if self.is_reserved(name) {
            self.reserved.call_tool(name, arguments).await
        } else {
            self.base.call_tool(name, arguments).await
        }
    }
}

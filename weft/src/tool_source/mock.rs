//! Mock tool source for tests.
//!
//! Fixed tool list; per-tool queued results and injected failures; a call
//! log for asserting dispatch order. Unmatched names fall back to the
//! default result so simple tests need no per-tool setup.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ToolReturn, ToolSource, ToolSourceError, ToolSpec};

enum Outcome {
    Ok(ToolReturn),
    Err(String),
}

/// Mock tool source: fixed specs, scripted per-tool outcomes, call log.
pub struct MockToolSource {
    specs: Vec<ToolSpec>,
    queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
    default_result: Value,
    log: Mutex<Vec<(String, Value)>>,
}

impl MockToolSource {
    /// Source with the given tool specs; every call answers `default_result`.
    pub fn new(specs: Vec<ToolSpec>, default_result: Value) -> Self {
        Self {
            specs,
            queued: Mutex::new(HashMap::new()),
            default_result,
            log: Mutex::new(Vec::new()),
        }
    }

    /// One-tool example source answering a fixed string.
    pub fn single(name: &str, description: &str, result: impl Into<String>) -> Self {
        Self::new(
            vec![ToolSpec {
                name: name.into(),
                description: Some(description.into()),
                input_schema: serde_json::json!({"type": "object", "properties": {}}),
            }],
            Value::String(result.into()),
        )
    }

    /// Queues the next result for `name` (builder). Queued outcomes win over
    /// the default and drain in FIFO order.
    pub fn with_result(self, name: &str, result: ToolReturn) -> Self {
        self.queued
            .lock()
            .expect("mock queue lock")
            .entry(name.to_string())
            .or_default()
            .push_back(Outcome::Ok(result));
        self
    }

    /// Queues a failure for `name` (builder).
    pub fn with_error(self, name: &str, message: impl Into<String>) -> Self {
        self.queued
            .lock()
            .expect("mock queue lock")
            .entry(name.to_string())
            .or_default()
            .push_back(Outcome::Err(message.into()));
        self
    }

    /// Every `(tool, arguments)` pair dispatched so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.specs.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolReturn, ToolSourceError> {
        self.log
            .lock()
            .expect("mock log lock")
            .push((name.to_string(), arguments));
        let queued = self
            .queued
            .lock()
            .expect("mock queue lock")
            .get_mut(name)
            .and_then(|q| q.pop_front());
        match queued {
            Some(Outcome::Ok(ret)) => Ok(ret),
            Some(Outcome::Err(message)) => Err(ToolSourceError::Execution(message)),
            None => Ok(ToolReturn::from_value(self.default_result.clone())),
        }
    }
}

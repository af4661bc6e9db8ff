//! Event sinks: the single `emit` seam the orchestration layers decorate.
//!
//! A sink is passed down the call chain (executor → agent → loop); each layer
//! wraps the inner sink with its own tagging. Emission is synchronous and
//! must not block: channel-backed sinks should use `try_send` and drop on a
//! full queue rather than stall a running node.

use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Receives one event. Implementations must be cheap; slow consumers belong
/// behind a channel.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Value);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Value) {}
}

/// Wraps a callback as a sink.
#[derive(Clone)]
pub struct FnSink {
    callback: Arc<dyn Fn(Value) + Send + Sync>,
}

impl FnSink {
    pub fn new(callback: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl EventSink for FnSink {
    fn emit(&self, event: Value) {
        (self.callback)(event);
    }
}

impl std::fmt::Debug for FnSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSink").field("callback", &"<fn>").finish()
    }
}

/// Collects events into a shared vector. Test helper and small-run buffer.
#[derive(Clone, Debug, Default)]
pub struct CollectSink {
    events: Arc<Mutex<Vec<Value>>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything emitted so far.
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

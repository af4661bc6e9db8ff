//! Sink decorators wiring the event pipeline.
//!
//! The sink travels down the call chain and each layer wraps it:
//! the loop emits raw `react:*` events into an [`AgentScopeSink`]
//! (re-tag + `agentId`), which the executor wrapped in a [`NodeScopeSink`]
//! (`nodeId`), which the orchestrator wrapped in a [`StampSink`]
//! (`timestamp` + `seq`) over a [`FanoutSink`] (subscriber + tracker).
//! Decorating instead of re-subscribing keeps per-observer ordering
//! consistent with the operations the events describe.

use std::sync::{Arc, Mutex};

use event_wire::{agent_scope, node_scope, EventSink, EventStamp};
use serde_json::Value;

/// Re-tags `react:*` events into the `agent:*` namespace and attaches the
/// agent id.
pub struct AgentScopeSink {
    inner: Arc<dyn EventSink>,
    agent_id: String,
}

impl AgentScopeSink {
    pub fn new(inner: Arc<dyn EventSink>, agent_id: impl Into<String>) -> Self {
        Self {
            inner,
            agent_id: agent_id.into(),
        }
    }
}

impl EventSink for AgentScopeSink {
    fn emit(&self, mut event: Value) {
        agent_scope(&mut event, &self.agent_id);
        self.inner.emit(event);
    }
}

/// Attaches the workflow node id, so observers can locate events in the
/// graph even when one agent serves several nodes.
pub struct NodeScopeSink {
    inner: Arc<dyn EventSink>,
    node_id: String,
}

impl NodeScopeSink {
    pub fn new(inner: Arc<dyn EventSink>, node_id: impl Into<String>) -> Self {
        Self {
            inner,
            node_id: node_id.into(),
        }
    }
}

impl EventSink for NodeScopeSink {
    fn emit(&self, mut event: Value) {
        node_scope(&mut event, &self.node_id);
        self.inner.emit(event);
    }
}

/// Outermost decorator: stamps `timestamp` and a monotonic `seq` per run.
pub struct StampSink {
    inner: Arc<dyn EventSink>,
    stamp: Mutex<EventStamp>,
}

impl StampSink {
    pub fn new(inner: Arc<dyn EventSink>) -> Self {
        Self {
            inner,
            stamp: Mutex::new(EventStamp::new()),
        }
    }
}

impl EventSink for StampSink {
    fn emit(&self, mut event: Value) {
        if let Ok(mut stamp) = self.stamp.lock() {
            stamp.stamp(&mut event);
        }
        self.inner.emit(event);
    }
}

/// Delivers each event to every attached sink, in attachment order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: Value) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_wire::CollectSink;
    use serde_json::json;

    /// **Scenario**: the full decorator chain re-tags, attaches ids, and stamps.
    #[test]
    fn decorator_chain_tags_and_stamps() {
        let collect = Arc::new(CollectSink::new());
        let stamped = Arc::new(StampSink::new(collect.clone()));
        let node = Arc::new(NodeScopeSink::new(stamped, "step-1"));
        let agent = AgentScopeSink::new(node, "writer-agent");

        agent.emit(json!({"type": "react:action", "toolName": "valSet"}));
        agent.emit(json!({"type": "react:thinking", "iteration": 1}));

        let events = collect.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["type"], "agent:tool-call");
        assert_eq!(events[0]["agentId"], "writer-agent");
        assert_eq!(events[0]["nodeId"], "step-1");
        assert_eq!(events[0]["seq"], 1);
        assert_eq!(events[1]["type"], "agent:thinking");
        assert_eq!(events[1]["seq"], 2);
    }

    /// **Scenario**: fan-out delivers to every sink in order.
    #[test]
    fn fanout_delivers_to_all() {
        let a = Arc::new(CollectSink::new());
        let b = Arc::new(CollectSink::new());
        let fanout = FanoutSink::new(vec![a.clone(), b.clone()]);
        fanout.emit(json!({"type": "x"}));
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }
}

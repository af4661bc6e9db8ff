//! Scope re-tagging and field injection for events crossing layers.
//!
//! An event leaves the loop as `react:*`, becomes `agent:*` with an
//! `agentId` at the agent layer, gains a `nodeId` at the workflow layer, and
//! is stamped with `timestamp` and `seq` at the outermost sink. Injection
//! never overwrites keys already present, so inner layers win.

use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Rewrites a loop event into the agent namespace and attaches `agentId`.
///
/// Three loop types have dedicated agent names (`action` → `tool-call`,
/// `observation` → `tool-result`, `observation-error` → `tool-error`); the
/// rest keep their name under the `agent:` prefix.
pub fn agent_scope(value: &mut Value, agent_id: &str) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    if let Some(Value::String(t)) = obj.get("type") {
        let renamed = match t.as_str() {
            "react:action" => Some("agent:tool-call".to_string()),
            "react:observation" => Some("agent:tool-result".to_string()),
            "react:observation-error" => Some("agent:tool-error".to_string()),
            other => other
                .strip_prefix("react:")
                .map(|rest| format!("agent:{rest}")),
        };
        if let Some(t) = renamed {
            obj.insert("type".to_string(), Value::String(t));
        }
    }
    obj.entry("agentId")
        .or_insert_with(|| Value::String(agent_id.to_string()));
}

/// Attaches the workflow node id so observers can locate the event in the
/// graph even when an agent is reused across nodes. `nodeId` is distinct
/// from `agentId` and never overwrites it.
pub fn node_scope(value: &mut Value, node_id: &str) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    obj.entry("nodeId")
        .or_insert_with(|| Value::String(node_id.to_string()));
}

/// Stamps `timestamp` (ms since epoch) and a per-stream monotonic `seq`.
///
/// One stamp instance per subscriber view; `seq` makes ordering explicit
/// even when two events share a millisecond.
#[derive(Debug)]
pub struct EventStamp {
    next_seq: u64,
}

impl EventStamp {
    pub fn new() -> Self {
        Self { next_seq: 1 }
    }

    pub fn stamp(&mut self, value: &mut Value) {
        let Some(obj) = value.as_object_mut() else {
            return;
        };
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        obj.entry("timestamp")
            .or_insert_with(|| Value::Number(millis.into()));
        obj.entry("seq")
            .or_insert_with(|| Value::Number(self.next_seq.into()));
        self.next_seq += 1;
    }
}

impl Default for EventStamp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: `react:action` becomes `agent:tool-call`; plain names keep their suffix.
    #[test]
    fn agent_scope_renames_and_attaches_agent_id() {
        let mut v = json!({"type": "react:action", "toolName": "valSet"});
        agent_scope(&mut v, "writer-agent");
        assert_eq!(v["type"], "agent:tool-call");
        assert_eq!(v["agentId"], "writer-agent");

        let mut v = json!({"type": "react:thinking", "iteration": 1});
        agent_scope(&mut v, "writer-agent");
        assert_eq!(v["type"], "agent:thinking");

        let mut v = json!({"type": "react:observation-error"});
        agent_scope(&mut v, "a");
        assert_eq!(v["type"], "agent:tool-error");
    }

    /// **Scenario**: injection does not overwrite an existing agentId (inner layer wins).
    #[test]
    fn agent_scope_does_not_overwrite_existing_id() {
        let mut v = json!({"type": "agent:start", "agentId": "inner"});
        agent_scope(&mut v, "outer");
        assert_eq!(v["agentId"], "inner");
    }

    /// **Scenario**: node_scope adds nodeId alongside agentId without touching the type.
    #[test]
    fn node_scope_attaches_node_id() {
        let mut v = json!({"type": "agent:complete", "agentId": "a"});
        node_scope(&mut v, "step-2");
        assert_eq!(v["nodeId"], "step-2");
        assert_eq!(v["agentId"], "a");
        assert_eq!(v["type"], "agent:complete");
    }

    /// **Scenario**: stamp injects timestamp and a monotonically increasing seq.
    #[test]
    fn stamp_seq_is_monotonic() {
        let mut stamp = EventStamp::new();
        let mut a = json!({"type": "x"});
        let mut b = json!({"type": "y"});
        stamp.stamp(&mut a);
        stamp.stamp(&mut b);
        assert_eq!(a["seq"], 1);
        assert_eq!(b["seq"], 2);
        assert!(a["timestamp"].as_u64().unwrap() > 0);
    }
}

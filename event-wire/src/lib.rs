//! Event wire shape for weft runs: type + payload, scope re-tagging, sinks.
//!
//! This crate defines the wire shape of a single orchestration event and the
//! re-tagging applied as an event crosses layers (loop → agent → workflow).
//! It does not depend on weft; weft serializes its payloads into
//! `serde_json::Value` and emits through [`EventSink`].
//!
//! Layering: the ReAct loop emits [`LoopEvent`]s (`react:*`); the agent layer
//! re-tags them into the `agent:*` namespace and attaches `agentId`
//! ([`scope::agent_scope`]); the workflow layer attaches `nodeId`
//! ([`scope::node_scope`]); the outermost sink stamps `timestamp` and `seq`
//! ([`scope::EventStamp`]).

pub mod event;
pub mod scope;
pub mod sink;

pub use event::{AgentEvent, LoopEvent, WorkflowEvent};
pub use scope::{agent_scope, node_scope, EventStamp};
pub use sink::{CollectSink, EventSink, FnSink, NullSink};

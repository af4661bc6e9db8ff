//! Workflow graph types: nodes, steps, and the workflow record.
//!
//! A workflow is a DAG of [`AgentNode`]s; edges are expressed as each node's
//! `dependencies` list. Immutable after construction; [`crate::scheduler`]
//! validates the graph and turns it into parallel levels.

use serde::{Deserialize, Serialize};

/// One enumerated step inside a node's task description.
///
/// Step numbers are global across the workflow (monotonic over the authoring
/// order), so prompts can reference "step 4" unambiguously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStep {
    pub number: u32,
    pub description: String,
}

/// One unit of work in the workflow DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    /// Unique id within the graph.
    pub id: String,
    /// Agent-selector tag; resolved against the registry at execution time.
    #[serde(rename = "type")]
    pub agent_type: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub steps: Vec<NodeStep>,
    /// Ids of predecessor nodes in the same graph.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl AgentNode {
    /// Node with no steps and no dependencies.
    pub fn new(
        id: impl Into<String>,
        agent_type: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            name: name.into(),
            description: description.into(),
            steps: vec![],
            dependencies: vec![],
        }
    }

    /// Builder: set dependencies.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Builder: set enumerated steps.
    pub fn with_steps(mut self, steps: Vec<NodeStep>) -> Self {
        self.steps = steps;
        self
    }
}

/// A submitted workflow: id, human naming, and the agent graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub nodes: Vec<AgentNode>,
}

impl Workflow {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        nodes: Vec<AgentNode>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            nodes,
        }
    }

    /// The workflow's top-level task line used in agent prompts.
    pub fn task(&self) -> &str {
        &self.description
    }
}

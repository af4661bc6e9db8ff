//! Agent registry: named agents resolved by a node's type tag.

use std::sync::Arc;

use crate::agent::BaseAgent;

/// Registered agents, in registration order. Duplicate registrations (same
/// definition id) overwrite in place, so resolution order stays stable.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<BaseAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent under its definition id; a duplicate id replaces
    /// the earlier registration.
    pub fn register(&mut self, agent: BaseAgent) {
        let agent = Arc::new(agent);
        let id = &agent.definition().id;
        if let Some(existing) = self
            .agents
            .iter_mut()
            .find(|a| &a.definition().id == id)
        {
            *existing = agent;
        } else {
            self.agents.push(agent);
        }
    }

    /// Resolves a node's type tag. Order: exact match on `<type>-agent`,
    /// then exact id match, then case-insensitive substring match on id or
    /// name.
    pub fn resolve(&self, node_type: &str) -> Option<Arc<BaseAgent>> {
        let suffixed = format!("{node_type}-agent");
        if let Some(agent) = self.agents.iter().find(|a| a.definition().id == suffixed) {
            return Some(Arc::clone(agent));
        }
        if let Some(agent) = self.agents.iter().find(|a| a.definition().id == node_type) {
            return Some(Arc::clone(agent));
        }
        let needle = node_type.to_lowercase();
        self.agents
            .iter()
            .find(|a| {
                a.definition().id.to_lowercase().contains(&needle)
                    || a.definition().name.to_lowercase().contains(&needle)
            })
            .map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDefinition;
    use crate::llm::MockLlm;
    use crate::tool_source::MockToolSource;
    use serde_json::json;
    use std::sync::Arc;

    fn agent(id: &str, name: &str) -> BaseAgent {
        BaseAgent::new(
            AgentDefinition::new(id, name, "test agent"),
            Arc::new(MockLlm::new("ok")),
            Arc::new(MockToolSource::new(vec![], json!("x"))),
        )
    }

    /// **Scenario**: `<type>-agent` wins over a plain id and over substring matches.
    #[test]
    fn resolution_order() {
        let mut registry = AgentRegistry::new();
        registry.register(agent("research", "Plain"));
        registry.register(agent("research-agent", "Suffixed"));
        registry.register(agent("deep-research-agent", "Substring"));

        let resolved = registry.resolve("research").unwrap();
        assert_eq!(resolved.definition().id, "research-agent");
    }

    /// **Scenario**: exact id match applies when no `<type>-agent` id exists.
    #[test]
    fn exact_id_match() {
        let mut registry = AgentRegistry::new();
        registry.register(agent("writer", "Writer"));
        assert_eq!(
            registry.resolve("writer").unwrap().definition().id,
            "writer"
        );
    }

    /// **Scenario**: case-insensitive substring match on id or name as last resort.
    #[test]
    fn substring_match_on_id_or_name() {
        let mut registry = AgentRegistry::new();
        registry.register(agent("summarizer-agent", "The Summarizer"));
        assert!(registry.resolve("SUMMAR").is_some());
        assert!(registry.resolve("the summ").is_some());
        assert!(registry.resolve("ghost").is_none());
    }

    /// **Scenario**: duplicate registration overwrites in place.
    #[test]
    fn duplicate_registration_overwrites() {
        let mut registry = AgentRegistry::new();
        registry.register(agent("writer", "First"));
        registry.register(agent("writer", "Second"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("writer").unwrap().definition().name, "Second");
    }
}

//! Prompt assembly for agent runs.
//!
//! The system prompt is built from the agent's declared identity, the node's
//! assignment (with enumerated steps where they add detail), the workflow's
//! top-level task, the wall clock, the tool roster, and a fixed instruction
//! block about the data-sharing tools. The initial user message carries the
//! parent nodes' summaries — never their raw outputs.

use chrono::Local;

use crate::agent::AgentDefinition;
use crate::context::ExecutionContext;
use crate::tool_source::{TOOL_VAL_GET, TOOL_VAL_LIST, TOOL_VAL_SET};
use crate::workflow::AgentNode;

/// Cap on each parent summary quoted into a child's prompt.
const MAX_PARENT_SUMMARY_CHARS: usize = 500;

/// Shortens a summary to roughly `max_len` characters for prompt embedding.
/// Cuts at the last word boundary that fits and appends "..."; a single
/// overlong token falls back to the widest char boundary that fits.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let budget = max_len.saturating_sub(3);
    let mut cut = 0;
    for (idx, ch) in s.char_indices() {
        if idx > budget {
            break;
        }
        if ch.is_whitespace() {
            cut = idx;
        }
    }
    if cut == 0 {
        cut = s
            .char_indices()
            .map(|(idx, _)| idx)
            .take_while(|&idx| idx <= budget)
            .last()
            .unwrap_or(0);
    }
    format!("{}...", s[..cut].trim_end())
}

/// Whether the node's steps add information beyond its description.
fn steps_add_detail(node: &AgentNode) -> bool {
    match node.steps.len() {
        0 => false,
        1 => node.steps[0].description != node.description,
        _ => true,
    }
}

/// Assembles the full system prompt for one node run.
pub fn build_system_prompt(
    definition: &AgentDefinition,
    node: &AgentNode,
    workflow_task: &str,
    tool_names: &[String],
) -> String {
    let mut sections = Vec::new();

    let mut identity = format!(
        "You are {} ({}). {}",
        definition.name, definition.id, definition.description
    );
    if !definition.capabilities.is_empty() {
        identity.push_str("\nCapabilities:");
        for cap in &definition.capabilities {
            identity.push_str(&format!("\n- {cap}"));
        }
    }
    sections.push(identity);

    let mut assignment = format!(
        "CURRENT ASSIGNMENT:\nNode '{}' ({}): {}",
        node.id, node.name, node.description
    );
    if steps_add_detail(node) {
        assignment.push_str("\nSteps:");
        for step in &node.steps {
            assignment.push_str(&format!("\n{}. {}", step.number, step.description));
        }
    }
    sections.push(assignment);

    sections.push(format!("Overall workflow goal: {workflow_task}"));

    sections.push(format!(
        "Current time: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S %z")
    ));

    sections.push(format!("Available tools: {}", tool_names.join(", ")));

    sections.push(format!(
        "DATA SHARING:\n\
         Use {TOOL_VAL_SET} to store structured results other agents will need, \
         {TOOL_VAL_GET} to read a value a previous agent stored, and {TOOL_VAL_LIST} \
         to discover what has been shared. Store data under descriptive keys as soon \
         as you produce it; prompts only carry short summaries, so anything detailed \
         must go through the shared store."
    ));

    sections.join("\n\n")
}

/// Builds the initial user message for a node.
///
/// Root nodes get a plain task request; dependent nodes get each parent's
/// id and result summary (truncated), then a restatement of their own task.
pub fn build_initial_user_message(node: &AgentNode, ctx: &ExecutionContext) -> String {
    if node.dependencies.is_empty() {
        return format!("Please complete the task: {}", node.description);
    }

    let mut parts = vec!["The following parent tasks have completed:".to_string()];
    for dep in &node.dependencies {
        let line = match ctx.get_output(dep) {
            Some(output) => format!(
                "- {dep}: {}",
                truncate(&output.summary, MAX_PARENT_SUMMARY_CHARS)
            ),
            None => format!("- {dep}: (no output available)"),
        };
        parts.push(line);
    }
    parts.push(String::new());
    parts.push(format!(
        "Using their results, complete the task: {}",
        node.description
    ));
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AgentExecutionResult, ResultStatus};
    use crate::workflow::NodeStep;
    use serde_json::json;

    fn definition() -> AgentDefinition {
        AgentDefinition::new("research-agent", "Researcher", "Finds and digests sources.")
            .with_capabilities(vec!["web research".into()])
    }

    fn output(node_id: &str, summary: &str) -> AgentExecutionResult {
        AgentExecutionResult {
            node_id: node_id.into(),
            data: json!({}),
            summary: summary.into(),
            status: ResultStatus::Success,
            error: None,
            duration_ms: 1,
            iterations: 1,
        }
    }

    /// **Scenario**: the system prompt carries identity, assignment, goal, time,
    /// tools, and the data-sharing block.
    #[test]
    fn system_prompt_has_all_sections() {
        let node = AgentNode::new("n1", "research", "Research", "find three sources");
        let prompt = build_system_prompt(
            &definition(),
            &node,
            "write a survey",
            &["valSet".into(), "search".into()],
        );
        assert!(prompt.contains("You are Researcher (research-agent)"));
        assert!(prompt.contains("web research"));
        assert!(prompt.contains("Node 'n1'"));
        assert!(prompt.contains("Overall workflow goal: write a survey"));
        assert!(prompt.contains("Current time: "));
        assert!(prompt.contains("Available tools: valSet, search"));
        assert!(prompt.contains("DATA SHARING"));
        assert!(prompt.contains("valGet"));
    }

    /// **Scenario**: steps are enumerated when there are several, or when the
    /// single step differs from the node description; omitted otherwise.
    #[test]
    fn steps_enumerated_only_when_informative() {
        let base = AgentNode::new("n1", "t", "N", "do the thing");

        let multi = base.clone().with_steps(vec![
            NodeStep {
                number: 3,
                description: "first part".into(),
            },
            NodeStep {
                number: 4,
                description: "second part".into(),
            },
        ]);
        let prompt = build_system_prompt(&definition(), &multi, "goal", &[]);
        assert!(prompt.contains("3. first part"));
        assert!(prompt.contains("4. second part"));

        let same = base.clone().with_steps(vec![NodeStep {
            number: 1,
            description: "do the thing".into(),
        }]);
        let prompt = build_system_prompt(&definition(), &same, "goal", &[]);
        assert!(!prompt.contains("Steps:"));

        let differs = base.with_steps(vec![NodeStep {
            number: 1,
            description: "a more precise account".into(),
        }]);
        let prompt = build_system_prompt(&definition(), &differs, "goal", &[]);
        assert!(prompt.contains("1. a more precise account"));
    }

    /// **Scenario**: a root node gets the plain task request.
    #[test]
    fn root_node_user_message() {
        let ctx = ExecutionContext::new("w", "task");
        let node = AgentNode::new("n1", "t", "N", "collect the data");
        assert_eq!(
            build_initial_user_message(&node, &ctx),
            "Please complete the task: collect the data"
        );
    }

    /// **Scenario**: a dependent node lists each parent's summary — never raw
    /// output — then restates its own task.
    #[test]
    fn dependent_node_lists_parent_summaries() {
        let ctx = ExecutionContext::new("w", "task");
        ctx.set_output(output("a", "found 3 sources"));
        let node = AgentNode::new("d", "t", "N", "merge everything")
            .with_dependencies(vec!["a".into(), "b".into()]);
        let msg = build_initial_user_message(&node, &ctx);
        assert!(msg.contains("- a: found 3 sources"));
        assert!(msg.contains("- b: (no output available)"));
        assert!(msg.contains("Using their results, complete the task: merge everything"));
        // Raw structured output stays out of prompts.
        assert!(!msg.contains("{"));
    }

    /// **Scenario**: truncation cuts at a word boundary when one fits, and
    /// falls back to a plain cut for a single overlong token.
    #[test]
    fn truncate_prefers_word_boundaries() {
        let worded = format!("{} tail", "word ".repeat(200));
        let out = truncate(&worded, 50);
        assert!(out.len() <= 50);
        assert!(out.ends_with("..."));
        // No mid-word cut: everything before the ellipsis is whole words.
        assert!(out.trim_end_matches("...").split_whitespace().all(|w| w == "word"));

        let unbroken = "y".repeat(400);
        let out = truncate(&unbroken, 50);
        assert!(out.len() <= 50);
        assert!(out.ends_with("..."));
    }

    /// **Scenario**: long parent summaries are truncated.
    #[test]
    fn parent_summaries_truncated() {
        let ctx = ExecutionContext::new("w", "task");
        ctx.set_output(output("a", &"x".repeat(2000)));
        let node = AgentNode::new("d", "t", "N", "merge").with_dependencies(vec!["a".into()]);
        let msg = build_initial_user_message(&node, &ctx);
        assert!(msg.len() < 1000);
        assert!(msg.contains("..."));
    }
}

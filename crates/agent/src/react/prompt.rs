//! Prompt builder — renders the run state into the single user prompt
//! sent on every iteration.

use reagent_core::message::{Message, Role};
use reagent_core::tool::ToolDefinition;
use serde_json::Value;

use super::parser::{ACTION, ACTION_INPUT, OBSERVATION, THOUGHT};
use super::state::ExecutionStep;

const PREAMBLE: &str = "You are an intelligent agent designed to solve user tasks by thinking \
step-by-step and using the available tools when they help.";

/// Renders prompts for the ReAct loop. Pure: the same inputs always give
/// the same text.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    format_instructions: String,
}

impl PromptBuilder {
    pub fn new(format_instructions: impl Into<String>) -> Self {
        Self {
            format_instructions: format_instructions.into(),
        }
    }

    /// One line per tool, `final_answer` last.
    pub fn tool_catalog(tools: &[ToolDefinition]) -> String {
        let mut lines: Vec<String> = tools.iter().map(catalog_line).collect();
        if lines.is_empty() {
            lines.push("No tools available.".into());
        }
        lines.push(catalog_line(&ToolDefinition::final_answer()));
        lines.join("\n")
    }

    pub fn build(
        &self,
        task: &str,
        catalog: &str,
        steps: &[ExecutionStep],
        history: &[Message],
    ) -> String {
        let mut prompt = format!("{PREAMBLE}\n\nAvailable tools:\n{catalog}\n\n{}\n", self.format_instructions);

        let conversation: Vec<String> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect();
        if !conversation.is_empty() {
            prompt.push_str("\nConversation so far:\n");
            prompt.push_str(&conversation.join("\n"));
            prompt.push('\n');
        }

        prompt.push_str(&format!("\nCurrent Task: \"{task}\"\n\n"));

        if steps.is_empty() {
            prompt.push_str("Start!\n");
        } else {
            prompt.push_str("Previous steps:\n");
            for step in steps {
                prompt.push_str(&render_step(step));
                prompt.push('\n');
            }
        }

        prompt.push_str("\nYour turn. Start with \"Thought:\".");
        prompt
    }
}

fn catalog_line(tool: &ToolDefinition) -> String {
    let parameters = tool
        .parameters
        .as_ref()
        .and_then(|schema| schema.get("properties"))
        .map(Value::to_string)
        .unwrap_or_else(|| "{}".into());
    format!("{}: {} Parameters: {parameters}", tool.name, tool.description)
}

fn render_step(step: &ExecutionStep) -> String {
    let mut block = format!("{THOUGHT} {}\n", step.reasoning);
    if let Some(action) = &step.action {
        block.push_str(&format!("{ACTION} {}\n", action.name));
        block.push_str(&format!("{ACTION_INPUT} {}\n", action.input.to_value()));
    }
    if let Some(observation) = &step.observation {
        block.push_str(&format!("{OBSERVATION} {}\n", observation.render()));
    }
    block
}

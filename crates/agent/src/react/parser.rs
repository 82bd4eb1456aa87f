//! Action parser — turns a raw model response into reasoning, an optional
//! action, and a terminal flag.
//!
//! Line-based over the text protocol:
//!
//! ```text
//! Thought: <reasoning>
//! Action: <tool name>
//! Action Input: <JSON, or free text>
//! ```
//!
//! or `Final Answer: <answer>`. Parsing never fails; a response with no
//! recognizable marker yields empty fields.

use reagent_core::FINAL_ANSWER_TOOL;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const THOUGHT: &str = "Thought:";
pub const ACTION: &str = "Action:";
pub const ACTION_INPUT: &str = "Action Input:";
pub const OBSERVATION: &str = "Observation:";
pub const FINAL_ANSWER: &str = "Final Answer:";

/// The input the model gave for an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ActionInput {
    /// The input parsed as JSON.
    Structured(Value),
    /// JSON parsing failed; the trimmed text as written.
    Raw(String),
}

impl ActionInput {
    /// The input as a JSON value; raw text becomes a JSON string.
    pub fn to_value(&self) -> Value {
        match self {
            ActionInput::Structured(v) => v.clone(),
            ActionInput::Raw(s) => Value::String(s.clone()),
        }
    }

    /// Compact JSON serialization, key order as written by the model.
    pub fn serialized(&self) -> String {
        match self {
            ActionInput::Structured(v) => v.to_string(),
            ActionInput::Raw(s) => Value::String(s.clone()).to_string(),
        }
    }
}

/// A named tool request extracted from a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    pub input: ActionInput,
}

impl ActionRequest {
    pub fn is_final_answer(&self) -> bool {
        self.name == FINAL_ANSWER_TOOL
    }
}

/// Result of parsing one model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub reasoning: String,
    pub action: Option<ActionRequest>,
    pub is_terminal: bool,
    pub final_answer: Option<String>,
}

/// Parse a raw response.
pub fn parse(text: &str) -> ParsedResponse {
    let lines: Vec<&str> = text.lines().collect();

    let reasoning = find_marker(&lines, THOUGHT)
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default();

    if let Some((index, rest)) = find_marker(&lines, FINAL_ANSWER) {
        // Everything after the marker, including following lines.
        let mut answer = vec![rest];
        answer.extend_from_slice(&lines[index + 1..]);
        return ParsedResponse {
            reasoning,
            action: None,
            is_terminal: true,
            final_answer: Some(answer.join("\n").trim().to_string()),
        };
    }

    let action = match (
        find_marker(&lines, ACTION),
        find_marker(&lines, ACTION_INPUT),
    ) {
        (Some((_, name)), Some((index, rest))) if !name.trim().is_empty() => Some(ActionRequest {
            name: name.trim().to_string(),
            input: parse_input(&input_block(&lines, index, rest)),
        }),
        _ => None,
    };

    match action {
        Some(action) if action.is_final_answer() => ParsedResponse {
            reasoning,
            final_answer: Some(final_answer_text(&action.input)),
            action: Some(action),
            is_terminal: true,
        },
        action => ParsedResponse {
            reasoning,
            action,
            is_terminal: false,
            final_answer: None,
        },
    }
}

/// First line whose trimmed form starts with `marker`, with the text after it.
fn find_marker<'a>(lines: &[&'a str], marker: &str) -> Option<(usize, &'a str)> {
    lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| line.trim_start().strip_prefix(marker).map(|rest| (i, rest)))
}

fn is_marker_line(line: &str) -> bool {
    let line = line.trim_start();
    [THOUGHT, ACTION, ACTION_INPUT, OBSERVATION, FINAL_ANSWER]
        .iter()
        .any(|m| line.starts_with(m))
}

/// The `Action Input:` text plus continuation lines up to the next marker.
fn input_block(lines: &[&str], index: usize, first: &str) -> String {
    let mut block = vec![first];
    block.extend(
        lines[index + 1..]
            .iter()
            .take_while(|line| !is_marker_line(line)),
    );
    block.join("\n").trim().to_string()
}

fn parse_input(text: &str) -> ActionInput {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return ActionInput::Structured(value);
    }
    if let Some(inner) = strip_code_fence(text)
        && let Ok(value) = serde_json::from_str::<Value>(inner)
    {
        return ActionInput::Structured(value);
    }
    ActionInput::Raw(text.to_string())
}

/// Inner text of a ```` ```json ... ``` ```` fence.
fn strip_code_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix("```")?.strip_suffix("```")?;
    let body = body.strip_prefix("json").unwrap_or(body);
    Some(body.trim())
}

/// The answer carried by a `final_answer` action: its `response` field,
/// or the whole input when there is none.
fn final_answer_text(input: &ActionInput) -> String {
    match input {
        ActionInput::Structured(value) => match value.get("response") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        },
        ActionInput::Raw(s) => s.clone(),
    }
}

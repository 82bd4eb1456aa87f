//! Format validator — checks a response for the protocol markers before
//! the parser's result is trusted.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::parser::{ACTION, ACTION_INPUT, FINAL_ANSWER, THOUGHT};

/// A required protocol element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatElement {
    Thought,
    Action,
    ActionInput,
}

impl FormatElement {
    pub fn marker(self) -> &'static str {
        match self {
            FormatElement::Thought => THOUGHT,
            FormatElement::Action => ACTION,
            FormatElement::ActionInput => ACTION_INPUT,
        }
    }
}

impl fmt::Display for FormatElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatElement::Thought => write!(f, "Thought"),
            FormatElement::Action => write!(f, "Action"),
            FormatElement::ActionInput => write!(f, "ActionInput"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatReport {
    pub is_valid: bool,
    /// Missing elements, in protocol order.
    pub missing: Vec<FormatElement>,
    pub has_final_answer: bool,
}

/// Check which markers a response carries.
///
/// A response with a `Final Answer:` line is always valid.
pub fn validate(text: &str) -> FormatReport {
    let has = |marker: &str| text.lines().any(|l| l.trim_start().starts_with(marker));

    let missing: Vec<FormatElement> = [
        FormatElement::Thought,
        FormatElement::Action,
        FormatElement::ActionInput,
    ]
    .into_iter()
    .filter(|e| !has(e.marker()))
    .collect();
    let has_final_answer = has(FINAL_ANSWER);

    FormatReport {
        is_valid: missing.is_empty() || has_final_answer,
        missing,
        has_final_answer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_response_is_valid() {
        let report = validate("Thought: x\nAction: calculate\nAction Input: {}");
        assert!(report.is_valid);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn missing_action_input_is_reported() {
        let report = validate("Thought: look it up\nAction: search");
        assert!(!report.is_valid);
        assert_eq!(report.missing, vec![FormatElement::ActionInput]);
        assert_eq!(report.missing[0].to_string(), "ActionInput");
    }

    #[test]
    fn final_answer_is_exempt() {
        let report = validate("Final Answer: 4");
        assert!(report.is_valid);
        assert!(report.has_final_answer);
        assert_eq!(report.missing.len(), 3);

        assert!(validate("Thought: sure\nFinal Answer: 4").is_valid);
    }

    #[test]
    fn any_missing_marker_without_final_answer_is_invalid() {
        assert!(!validate("Action: a\nAction Input: {}").is_valid);
        assert!(!validate("Thought: a\nAction Input: {}").is_valid);
        assert!(!validate("plain prose").is_valid);
    }

    #[test]
    fn action_input_line_does_not_count_as_action() {
        let report = validate("Thought: a\nAction Input: {}");
        assert_eq!(report.missing, vec![FormatElement::Action]);
    }
}

//! ResponseGrammar — the seam between the loop controller and the textual
//! protocol the model speaks.
//!
//! The controller only talks to this trait, so a stricter structured-output
//! grammar can replace the line-marker protocol without touching the state
//! machine.

use super::parser::{self, FINAL_ANSWER, ParsedResponse};
use super::validator::{self, FormatReport};

pub trait ResponseGrammar: Send + Sync {
    /// Check a raw response for the required protocol elements.
    fn validate(&self, text: &str) -> FormatReport;

    /// Parse a raw response. Never fails.
    fn parse(&self, text: &str) -> ParsedResponse;

    /// The system message sent on a corrective round-trip.
    fn correction_message(&self, report: &FormatReport) -> String;

    /// Describe the expected output format for the prompt.
    fn format_instructions(&self) -> String;

    /// Whether a response warrants a corrective round-trip.
    fn needs_correction(&self, text: &str, report: &FormatReport) -> bool {
        !report.is_valid && !text.trim_start().starts_with(FINAL_ANSWER)
    }
}

/// The `Thought:` / `Action:` / `Action Input:` / `Final Answer:` protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextProtocolGrammar;

impl ResponseGrammar for TextProtocolGrammar {
    fn validate(&self, text: &str) -> FormatReport {
        validator::validate(text)
    }

    fn parse(&self, text: &str) -> ParsedResponse {
        parser::parse(text)
    }

    fn correction_message(&self, report: &FormatReport) -> String {
        let missing = report
            .missing
            .iter()
            .map(|e| format!("\"{}\"", e.marker()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Your last response left the required format (missing: {missing}). \
             Reply again in the structured format: start with \"Thought:\", then \
             \"Action:\" with a tool name, then \"Action Input:\" with the JSON parameters. \
             Expected format:\n\
             Thought: [your reasoning]\n\
             Action: [tool name]\n\
             Action Input: {{\"param\": \"value\"}}\n\
             When you are done, use the final_answer tool or write \"Final Answer: [answer]\"."
        )
    }

    fn format_instructions(&self) -> String {
        "Respond using exactly this format:\n\
         Thought: your reasoning about what to do next\n\
         Action: the name of one tool from the list above\n\
         Action Input: the tool parameters as a JSON object\n\n\
         After each action you will receive an Observation with the result.\n\
         When you can answer the task, use:\n\
         Thought: I now know the answer\n\
         Action: final_answer\n\
         Action Input: {\"response\": \"your complete answer\"}\n\n\
         or write a single line starting with \"Final Answer:\" followed by the answer.\n\
         Do not write the Observation yourself."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_names_missing_markers() {
        let grammar = TextProtocolGrammar;
        let report = grammar.validate("Thought: x\nAction: search");
        let message = grammar.correction_message(&report);
        assert!(message.contains("\"Action Input:\""));
        assert!(message.contains("Thought: [your reasoning]"));
    }

    #[test]
    fn needs_correction_only_when_invalid() {
        let grammar = TextProtocolGrammar;
        let text = "Thought: x\nAction: search";
        assert!(grammar.needs_correction(text, &grammar.validate(text)));

        let text = "Final Answer: 4";
        assert!(!grammar.needs_correction(text, &grammar.validate(text)));

        let text = "Thought: x\nAction: a\nAction Input: {}";
        assert!(!grammar.needs_correction(text, &grammar.validate(text)));
    }

    #[test]
    fn instructions_use_protocol_markers() {
        let text = TextProtocolGrammar.format_instructions();
        for marker in ["Thought:", "Action:", "Action Input:", "Final Answer:"] {
            assert!(text.contains(marker), "missing {marker}");
        }
    }
}

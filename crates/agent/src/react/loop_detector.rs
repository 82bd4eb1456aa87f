//! Loop detector — flags the model repeating the same action with the
//! same input.
//!
//! Inputs are compared by their serialized JSON text, not structurally:
//! `{"a":1,"b":2}` and `{"b":2,"a":1}` are different actions here.

use super::state::ToolExecutionRecord;

/// Consecutive identical executions that count as a loop.
pub const LOOP_WINDOW: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopDetection {
    pub looping: bool,
    pub repeated_action: Option<String>,
}

/// Inspect the trailing window of executions.
pub fn detect(records: &[ToolExecutionRecord]) -> LoopDetection {
    if records.len() < LOOP_WINDOW {
        return LoopDetection::default();
    }
    let window = &records[records.len() - LOOP_WINDOW..];
    let first = &window[0];
    let looping = window.iter().all(|r| {
        r.action_name == first.action_name && r.serialized_input == first.serialized_input
    });

    LoopDetection {
        looping,
        repeated_action: looping.then(|| first.action_name.clone()),
    }
}

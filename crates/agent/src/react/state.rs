//! Per-run state owned by the loop controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::invoker::Observation;
use super::parser::ActionRequest;

/// Actions granted to the model to escape a detected loop.
pub const RECOVERY_BUDGET: u32 = 3;

/// One loop iteration: what the model thought, asked for, and got back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_index: usize,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
    pub timestamp: DateTime<Utc>,
}

/// An executed action, as seen by the loop detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    pub action_name: String,
    pub serialized_input: String,
    pub timestamp: DateTime<Utc>,
}

impl ToolExecutionRecord {
    pub fn new(action: &ActionRequest) -> Self {
        Self {
            action_name: action.name.clone(),
            serialized_input: action.input.serialized(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model gave a final answer.
    FinalAnswer,
    /// The loop persisted after the recovery budget was spent.
    LoopExhausted,
    /// The iteration ceiling was reached.
    SafetyCeiling,
    /// A fatal error ended the run.
    Error,
}

/// Controller state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    /// A loop warning was issued; the recovery budget is counting down.
    AwaitingRecovery,
    Terminated { success: bool },
}

/// Everything one run knows about itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub task_id: String,
    pub original_task: String,
    pub steps: Vec<ExecutionStep>,
    pub tool_executions: Vec<ToolExecutionRecord>,
    pub status: RunStatus,
    pub loop_warning_issued: bool,
    pub recovery_budget: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            original_task: task.into(),
            steps: Vec::new(),
            tool_executions: Vec::new(),
            status: RunStatus::Running,
            loop_warning_issued: false,
            recovery_budget: 0,
            termination: None,
            final_answer: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self.status {
            RunStatus::Completed => RunPhase::Terminated { success: true },
            RunStatus::Failed => RunPhase::Terminated { success: false },
            RunStatus::Running if self.loop_warning_issued => RunPhase::AwaitingRecovery,
            RunStatus::Running => RunPhase::Running,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.status != RunStatus::Running
    }

    /// Append a step and return its index.
    pub fn push_step(&mut self, reasoning: String, action: Option<ActionRequest>) -> usize {
        let step_index = self.steps.len();
        self.steps.push(ExecutionStep {
            step_index,
            reasoning,
            action,
            observation: None,
            timestamp: Utc::now(),
        });
        step_index
    }

    /// Fill in a step's observation. A step is observed at most once.
    pub fn observe(&mut self, step_index: usize, observation: Observation) {
        if let Some(step) = self.steps.get_mut(step_index)
            && step.observation.is_none()
        {
            step.observation = Some(observation);
        }
    }

    /// Record an executed action, spending one unit of recovery budget if a
    /// loop warning is outstanding.
    pub fn record_execution(&mut self, action: &ActionRequest) {
        self.tool_executions.push(ToolExecutionRecord::new(action));
        if self.loop_warning_issued {
            self.recovery_budget = self.recovery_budget.saturating_sub(1);
        }
    }

    /// Open the recovery window. Only the first call has an effect.
    pub fn issue_loop_warning(&mut self) -> bool {
        if self.loop_warning_issued {
            return false;
        }
        self.loop_warning_issued = true;
        self.recovery_budget = RECOVERY_BUDGET;
        true
    }

    pub fn recovery_exhausted(&self) -> bool {
        self.loop_warning_issued && self.recovery_budget == 0
    }

    pub fn complete(&mut self, answer: impl Into<String>) {
        self.finish(RunStatus::Completed, Termination::FinalAnswer, Some(answer.into()));
    }

    pub fn fail(&mut self, termination: Termination, message: Option<String>) {
        self.finish(RunStatus::Failed, termination, message);
    }

    fn finish(&mut self, status: RunStatus, termination: Termination, answer: Option<String>) {
        if self.is_terminated() {
            return;
        }
        self.status = status;
        self.termination = Some(termination);
        self.final_answer = answer;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::parser::ActionInput;
    use serde_json::json;

    fn search(q: &str) -> ActionRequest {
        ActionRequest {
            name: "search".into(),
            input: ActionInput::Structured(json!({ "q": q })),
        }
    }

    #[test]
    fn steps_are_densely_indexed() {
        let mut state = RunState::new("task");
        for i in 0..4 {
            assert_eq!(state.push_step(format!("t{i}"), None), i);
        }
        assert!(state.steps.iter().enumerate().all(|(i, s)| s.step_index == i));
    }

    #[test]
    fn observation_is_set_once() {
        let mut state = RunState::new("task");
        let i = state.push_step("t".into(), Some(search("x")));
        state.observe(i, Observation::Value(json!(1)));
        state.observe(i, Observation::Value(json!(2)));
        assert_eq!(state.steps[i].observation, Some(Observation::Value(json!(1))));
    }

    #[test]
    fn recovery_budget_counts_down_after_warning() {
        let mut state = RunState::new("task");
        state.record_execution(&search("x"));
        assert_eq!(state.recovery_budget, 0);
        assert!(!state.recovery_exhausted());

        assert!(state.issue_loop_warning());
        assert!(!state.issue_loop_warning());
        assert_eq!(state.phase(), RunPhase::AwaitingRecovery);

        for expected in [2, 1, 0, 0] {
            state.record_execution(&search("x"));
            assert_eq!(state.recovery_budget, expected);
        }
        assert!(state.recovery_exhausted());
    }

    #[test]
    fn termination_is_final() {
        let mut state = RunState::new("task");
        state.complete("42");
        state.fail(Termination::SafetyCeiling, Some("late".into()));
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.termination, Some(Termination::FinalAnswer));
        assert_eq!(state.final_answer.as_deref(), Some("42"));
        assert_eq!(state.phase(), RunPhase::Terminated { success: true });
    }

    #[test]
    fn serializes_for_archiving() {
        let mut state = RunState::new("task");
        state.push_step("t".into(), Some(search("x")));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "running");
        assert_eq!(value["steps"][0]["action"]["name"], "search");
        assert_eq!(value["steps"][0]["action"]["input"]["kind"], "structured");
        assert!(value.get("final_answer").is_none());
    }
}

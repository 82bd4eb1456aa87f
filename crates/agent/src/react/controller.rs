//! Adaptive loop controller — drives Thought → Action → Observation until
//! the model gives a final answer, a detected loop outlasts its recovery
//! budget, or the safety ceiling is reached.
//!
//! # Failure semantics
//!
//! - Model call failures and (under the default policy) unknown tools are
//!   fatal: the run is marked failed and the error is returned.
//! - Tool failures become observations the model sees next iteration.
//! - A malformed response gets exactly one corrective round-trip per
//!   iteration, then whatever parses is used.
//! - Three identical consecutive actions raise a one-time warning and open
//!   a recovery window of [`RECOVERY_BUDGET`] actions. A loop detected once
//!   the window is spent ends the run as failed with an explanation the
//!   model writes in one last call.
//!
//! Every non-fatal termination returns `Ok` with a user-facing answer;
//! inspect [`RunState::status`] to tell success from failure.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reagent_config::UnknownToolPolicy;
use reagent_core::error::{Error, Result, ToolError};
use reagent_core::event::{DomainEvent, EventBus};
use reagent_core::message::{Message, Role};
use reagent_core::provider::{Provider, ProviderRequest};
use reagent_core::tool::ToolRegistry;
use tracing::{debug, error, info, warn};

use super::grammar::{ResponseGrammar, TextProtocolGrammar};
use super::invoker::{Observation, ToolInvoker};
use super::loop_detector;
use super::parser::ActionRequest;
use super::prompt::PromptBuilder;
use super::state::{RECOVERY_BUDGET, RunState, RunStatus, Termination};
use crate::run_config::RunConfig;

/// Answer used when the model ends the run with an empty final answer.
pub const EMPTY_FINAL_ANSWER: &str = "Final answer provided.";

pub struct AdaptiveLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    grammar: Arc<dyn ResponseGrammar>,
    event_bus: Option<Arc<EventBus>>,
}

/// What one model call is sent: the standing instructions, any one-shot
/// system notices, and the rendered prompt.
struct Turns<'a> {
    instructions: Option<&'a str>,
    notices: &'a [String],
    prompt: &'a str,
}

impl AdaptiveLoop {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            grammar: Arc::new(TextProtocolGrammar),
            event_bus: None,
        }
    }

    /// Replace the response grammar.
    pub fn with_grammar(mut self, grammar: Arc<dyn ResponseGrammar>) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Run the loop over `state.original_task`.
    ///
    /// `history` is the conversation before this task; its first system
    /// turn is sent as instructions on every call. On a fatal error the
    /// state is marked failed before the error is returned.
    pub async fn run(
        &self,
        state: &mut RunState,
        history: &[Message],
        config: &RunConfig,
    ) -> Result<String> {
        info!(task_id = %state.task_id, "Starting ReAct run");
        self.publish(DomainEvent::RunStarted {
            task_id: state.task_id.clone(),
            task: state.original_task.clone(),
            timestamp: Utc::now(),
        });

        let result = self.drive(state, history, config).await;

        if let Err(e) = &result {
            error!(task_id = %state.task_id, error = %e, "ReAct run failed");
            state.fail(Termination::Error, None);
            self.publish(DomainEvent::ErrorOccurred {
                context: format!("react run {}", state.task_id),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        self.publish(DomainEvent::RunFinished {
            task_id: state.task_id.clone(),
            success: state.status == RunStatus::Completed,
            iterations: state.steps.len(),
            timestamp: Utc::now(),
        });
        result
    }

    async fn drive(
        &self,
        state: &mut RunState,
        history: &[Message],
        config: &RunConfig,
    ) -> Result<String> {
        let settings = &config.loop_settings;
        let invoker = ToolInvoker::new(Arc::clone(&self.tools)).with_timeout(settings.tool_timeout);
        let prompts = PromptBuilder::new(self.grammar.format_instructions());
        let catalog = PromptBuilder::tool_catalog(&self.tools.definitions());
        let instructions = history
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());

        let mut notices: Vec<String> = Vec::new();

        loop {
            if state.steps.len() >= settings.max_iterations {
                let message = format!(
                    "Could not determine an answer within {} iterations.",
                    settings.max_iterations
                );
                error!(task_id = %state.task_id, max_iterations = settings.max_iterations, "Safety ceiling reached");
                state.fail(Termination::SafetyCeiling, Some(message.clone()));
                return Ok(message);
            }

            let step = state.steps.len();
            debug!(task_id = %state.task_id, step, "ReAct iteration");

            let prompt = prompts.build(&state.original_task, &catalog, &state.steps, history);
            let pending = std::mem::take(&mut notices);
            let turns = Turns {
                instructions,
                notices: &pending,
                prompt: &prompt,
            };
            let mut text = self.call(&turns, config).await?;

            let report = self.grammar.validate(&text);
            if self.grammar.needs_correction(&text, &report) {
                let missing: Vec<String> = report.missing.iter().map(|e| e.to_string()).collect();
                warn!(task_id = %state.task_id, step, missing = ?missing, "Response left the protocol, requesting correction");
                self.publish(DomainEvent::FormatCorrected {
                    task_id: state.task_id.clone(),
                    missing,
                    timestamp: Utc::now(),
                });

                let mut corrected = pending.clone();
                corrected.push(self.grammar.correction_message(&report));
                let turns = Turns {
                    instructions,
                    notices: &corrected,
                    prompt: &prompt,
                };
                text = self.call(&turns, config).await?;
            }

            let parsed = self.grammar.parse(&text);
            let index = state.push_step(parsed.reasoning, parsed.action.clone());

            if parsed.is_terminal {
                let answer = parsed
                    .final_answer
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| EMPTY_FINAL_ANSWER.to_string());
                info!(task_id = %state.task_id, steps = state.steps.len(), "ReAct run completed");
                state.complete(answer.clone());
                return Ok(answer);
            }

            let Some(action) = parsed.action else {
                debug!(task_id = %state.task_id, step, "No action in response");
                continue;
            };

            let observation = self.execute(state, &invoker, &action, settings.unknown_tool).await?;
            state.observe(index, observation);

            let detection = loop_detector::detect(&state.tool_executions);
            if !detection.looping {
                continue;
            }

            let repeated = detection.repeated_action.unwrap_or(action.name);
            if state.issue_loop_warning() {
                warn!(task_id = %state.task_id, tool = %repeated, budget = RECOVERY_BUDGET, "Loop detected, issuing warning");
                self.publish(DomainEvent::LoopDetected {
                    task_id: state.task_id.clone(),
                    action_name: repeated.clone(),
                    terminal: false,
                    timestamp: Utc::now(),
                });
                notices.push(loop_warning(&repeated, state.recovery_budget));
            } else if state.recovery_exhausted() {
                error!(task_id = %state.task_id, tool = %repeated, "Loop persisted after recovery budget");
                self.publish(DomainEvent::LoopDetected {
                    task_id: state.task_id.clone(),
                    action_name: repeated.clone(),
                    terminal: true,
                    timestamp: Utc::now(),
                });
                let notice = [recovery_failed_notice(&repeated)];
                let prompt = recovery_failed_prompt(&state.original_task);
                let turns = Turns {
                    instructions,
                    notices: &notice,
                    prompt: &prompt,
                };
                let explanation = self.call(&turns, config).await?;
                state.fail(Termination::LoopExhausted, Some(explanation.clone()));
                return Ok(explanation);
            } else {
                debug!(task_id = %state.task_id, budget = state.recovery_budget, "Still looping within recovery window");
            }
        }
    }

    /// Run one action. Only an unknown tool under the fatal policy errors.
    async fn execute(
        &self,
        state: &mut RunState,
        invoker: &ToolInvoker,
        action: &ActionRequest,
        unknown_tool: UnknownToolPolicy,
    ) -> Result<Observation> {
        state.record_execution(action);
        let started = Instant::now();

        let observation = match invoker.invoke(&action.name, &action.input).await {
            Ok(observation) => observation,
            Err(e @ ToolError::NotFound(_)) if unknown_tool == UnknownToolPolicy::Observe => {
                warn!(task_id = %state.task_id, tool = %action.name, "Unknown tool, reporting to model");
                e.into()
            }
            Err(e) => return Err(Error::Tool(e)),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(task_id = %state.task_id, tool = %action.name, duration_ms, failed = observation.is_error(), "Tool executed");
        self.publish(DomainEvent::ToolExecuted {
            task_id: state.task_id.clone(),
            tool_name: action.name.clone(),
            success: !observation.is_error(),
            duration_ms,
            timestamp: Utc::now(),
        });
        Ok(observation)
    }

    async fn call(&self, turns: &Turns<'_>, config: &RunConfig) -> Result<String> {
        let mut messages = Vec::with_capacity(turns.notices.len() + 2);
        if let Some(instructions) = turns.instructions {
            messages.push(Message::system(instructions));
        }
        messages.extend(turns.notices.iter().map(|n| Message::system(n.as_str())));
        messages.push(Message::user(turns.prompt));

        let response = self
            .provider
            .complete(ProviderRequest {
                model: config.model.clone(),
                messages,
                options: config.options.clone(),
            })
            .await?;
        Ok(response.content)
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

fn loop_warning(action: &str, remaining: u32) -> String {
    format!(
        "Warning: you have repeated the same action ({action}) three consecutive times with the \
         same parameters. This suggests you are stuck in a loop. Reevaluate your strategy and try \
         a different approach, or give your final answer with the final_answer tool. \
         You have {remaining} actions remaining."
    )
}

fn recovery_failed_notice(action: &str) -> String {
    format!(
        "ReAct mode is being interrupted: the action ({action}) kept repeating after the loop \
         warning and recovery failed. Do not call any more tools."
    )
}

fn recovery_failed_prompt(task: &str) -> String {
    format!(
        "Explain to the user that you got stuck repeating the same step and could not recover, \
         then give the best final answer you can for the original task: {task}"
    )
}

//! The agent — a ReAct loop over a language model and a tool registry.
//!
//! The model is driven through a **Thought → Action → Observation** cycle:
//!
//! 1. **Prompt** with the task, the tool catalog and every previous step
//! 2. **Validate** the response format, correcting it once if needed
//! 3. **Parse** reasoning and the requested action
//! 4. **Act**: run the tool and record its observation
//! 5. **Watch** for the same action repeating and steer the model out of it
//!
//! The loop ends on a final answer, a loop that outlasts its recovery
//! window, or the configured iteration ceiling. [`ChatAgent`] wraps the
//! loop with conversation memory and a plain chat mode; in `auto` mode the
//! [`ToolIntentDetector`] picks between the two for each message.

pub mod chat_agent;
pub mod intent;
pub mod react;
pub mod run_config;

pub use chat_agent::{AgentProfile, ChatAgent, RUN_ARCHIVE_PREFIX};
pub use intent::{IntentAssessment, ToolIntentDetector};
pub use react::{AdaptiveLoop, ResponseGrammar, RunState, RunStatus, TextProtocolGrammar};
pub use run_config::{LoopSettings, RunConfig};

#[cfg(test)]
pub(crate) mod test_helpers;

//! The ReAct loop — Thought → Action → Observation over a text protocol.
//!
//! Components, leaves first:
//!
//! 1. **parser**: response text → reasoning, action, terminal flag
//! 2. **validator**: checks the protocol markers before a parse is trusted
//! 3. **grammar**: the `ResponseGrammar` seam bundling the two
//! 4. **invoker**: runs an action against the tool registry
//! 5. **loop_detector**: flags identical consecutive actions
//! 6. **prompt**: renders the run state into the per-iteration prompt
//! 7. **controller**: the state machine driving all of the above

pub mod controller;
pub mod grammar;
pub mod invoker;
pub mod loop_detector;
pub mod parser;
pub mod prompt;
pub mod state;
pub mod validator;

pub use controller::AdaptiveLoop;
pub use grammar::{ResponseGrammar, TextProtocolGrammar};
pub use invoker::{Observation, ToolInvoker};
pub use loop_detector::{LoopDetection, detect};
pub use parser::{ActionInput, ActionRequest, ParsedResponse, parse};
pub use prompt::PromptBuilder;
pub use state::{ExecutionStep, RunPhase, RunState, RunStatus, Termination, ToolExecutionRecord};
pub use validator::{FormatElement, FormatReport, validate};

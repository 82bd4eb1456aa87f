//! Conversation memory implementations for reagent.

pub mod manager;
pub mod token;
pub mod variables;
pub mod window;

pub use manager::MemoryManager;
pub use token::{estimate_messages_tokens, estimate_tokens};
pub use variables::ContextVariables;
pub use window::{DynamicWindowMemory, FixedWindowMemory};

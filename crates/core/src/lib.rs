//! # reagent core
//!
//! Domain types, traits, and error definitions for the reagent runtime.
//! This crate defines the domain model that every other crate implements
//! against: conversation turns, the language-model boundary, tools and
//! their registry, conversation memory, and domain events.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here. Implementations
//! live in their respective crates, which keeps the loop testable with
//! scripted providers and in-process tools.

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ErrorKind, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::ConversationMemory;
pub use message::{Message, Role};
pub use provider::{GenerationOptions, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{FINAL_ANSWER_TOOL, Tool, ToolDefinition, ToolRegistry};

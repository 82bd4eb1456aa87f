//! MemoryManager — a conversation window plus context variables, with
//! JSON snapshots for persistence.

use reagent_core::error::MemoryError;
use reagent_core::memory::ConversationMemory;
use reagent_core::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::variables::ContextVariables;
use crate::window::{DynamicWindowMemory, FixedWindowMemory};

/// Persisted form of a [`MemoryManager`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    variables: ContextVariables,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pinned: Vec<String>,
}

pub struct MemoryManager {
    memory: Box<dyn ConversationMemory>,
    variables: ContextVariables,
}

impl MemoryManager {
    pub fn new(memory: Box<dyn ConversationMemory>) -> Self {
        Self {
            memory,
            variables: ContextVariables::new(),
        }
    }

    /// A manager over a token-budgeted window.
    pub fn dynamic(max_tokens: usize) -> Self {
        Self::new(Box::new(DynamicWindowMemory::new(max_tokens)))
    }

    /// A manager over a fixed-size window.
    pub fn fixed(window_size: usize) -> Self {
        Self::new(Box::new(FixedWindowMemory::new(window_size)))
    }

    /// Name of the eviction strategy in use.
    pub fn strategy(&self) -> &str {
        self.memory.name()
    }

    // --- Turns ---

    pub fn add_message(&mut self, message: Message) {
        self.memory.add_message(message);
    }

    /// Append a turn and pin it so it is never evicted.
    pub fn add_pinned(&mut self, message: Message) {
        self.memory.add_pinned(message);
    }

    pub fn messages(&self) -> &[Message] {
        self.memory.messages()
    }

    pub fn pin(&mut self, index: usize) -> Result<(), MemoryError> {
        self.memory.pin(index)
    }

    pub fn pinned_ids(&self) -> Vec<String> {
        self.memory.pinned_ids()
    }

    // --- Variables ---

    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) {
        self.variables.set(key, value);
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn has_variable(&self, key: &str) -> bool {
        self.variables.has(key)
    }

    pub fn delete_variable(&mut self, key: &str) -> bool {
        self.variables.delete(key)
    }

    pub fn variables(&self) -> &ContextVariables {
        &self.variables
    }

    /// Drop all turns, pins and variables.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.variables.clear();
    }

    // --- Persistence ---

    /// Serialize turns, pins and variables as JSON.
    pub fn serialize(&self) -> Result<String, MemoryError> {
        let snapshot = Snapshot {
            messages: self.memory.messages().to_vec(),
            variables: self.variables.clone(),
            pinned: self.memory.pinned_ids(),
        };
        serde_json::to_string(&snapshot).map_err(|e| MemoryError::Encode(e.to_string()))
    }

    /// Restore from [`serialize`](Self::serialize) output.
    ///
    /// Turns are replaced (and re-pruned by the current strategy);
    /// variables are merged over the existing ones.
    pub fn deserialize(&mut self, data: &str) -> Result<(), MemoryError> {
        let snapshot: Snapshot =
            serde_json::from_str(data).map_err(|e| MemoryError::Decode(e.to_string()))?;
        self.memory
            .replace_messages(snapshot.messages, &snapshot.pinned);
        self.variables.merge(snapshot.variables);
        Ok(())
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new(Box::new(DynamicWindowMemory::default()))
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("strategy", &self.memory.name())
            .field("messages", &self.memory.len())
            .field("variables", &self.variables.len())
            .finish()
    }
}

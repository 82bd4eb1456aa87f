//! ConversationMemory trait — the turn log the agent reads its history from.
//!
//! Implementations decide what to evict when the log grows; the agent loop
//! only appends and reads. Pinned turns (system instructions, the first
//! user request) must survive every eviction.

use crate::error::MemoryError;
use crate::message::Message;

/// An ordered, append-only conversation log with an eviction policy.
///
/// Implementations: token-budgeted dynamic window, fixed-size window.
pub trait ConversationMemory: Send + Sync {
    /// The strategy name (e.g., "dynamic", "fixed").
    fn name(&self) -> &str;

    /// Append a turn, then apply the eviction policy. The appended turn
    /// itself is never evicted by that pass.
    fn add_message(&mut self, message: Message);

    /// Append a turn already marked as never-evictable, then apply the
    /// eviction policy.
    fn add_pinned(&mut self, message: Message);

    /// The retained turns, oldest first.
    fn messages(&self) -> &[Message];

    /// Drop every turn and every pin.
    fn clear(&mut self);

    /// Replace the whole log, pinning the turns whose IDs are listed,
    /// then apply the eviction policy.
    fn replace_messages(&mut self, messages: Vec<Message>, pinned_ids: &[String]);

    /// Mark the turn at `index` as never-evictable.
    fn pin(&mut self, index: usize) -> std::result::Result<(), MemoryError>;

    /// IDs of the pinned turns still in the log.
    fn pinned_ids(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.messages().len()
    }

    fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }
}

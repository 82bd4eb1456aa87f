//! Windowed conversation memories.
//!
//! Both strategies evict from the front of the log and never evict a
//! pinned turn. [`DynamicWindowMemory`] budgets by estimated tokens,
//! [`FixedWindowMemory`] by turn count.

use std::collections::HashSet;

use reagent_core::error::MemoryError;
use reagent_core::memory::ConversationMemory;
use reagent_core::message::Message;
use tracing::debug;

use crate::token::{estimate_messages_tokens, estimate_tokens};

/// Turns plus the set of pinned turn IDs.
#[derive(Debug, Default, Clone)]
struct TurnLog {
    messages: Vec<Message>,
    pinned: HashSet<String>,
}

impl TurnLog {
    fn is_pinned(&self, message: &Message) -> bool {
        self.pinned.contains(&message.id)
    }

    fn push(&mut self, message: Message, pinned: bool) {
        if pinned {
            self.pinned.insert(message.id.clone());
        }
        self.messages.push(message);
    }

    /// Remove the oldest unpinned turn, never the newest one. Returns it,
    /// or `None` if nothing is evictable.
    fn evict_oldest(&mut self) -> Option<Message> {
        let (_, older) = self.messages.split_last()?;
        let index = older.iter().position(|m| !self.is_pinned(m))?;
        Some(self.messages.remove(index))
    }

    fn pin(&mut self, index: usize) -> Result<(), MemoryError> {
        let message = self
            .messages
            .get(index)
            .ok_or(MemoryError::IndexOutOfRange {
                index,
                len: self.messages.len(),
            })?;
        self.pinned.insert(message.id.clone());
        Ok(())
    }

    fn replace(&mut self, messages: Vec<Message>, pinned_ids: &[String]) {
        self.pinned = messages
            .iter()
            .filter(|m| pinned_ids.contains(&m.id))
            .map(|m| m.id.clone())
            .collect();
        self.messages = messages;
    }

    fn pinned_ids(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| self.is_pinned(m))
            .map(|m| m.id.clone())
            .collect()
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.pinned.clear();
    }
}

/// Keeps the log within a token budget.
///
/// After every insert, the oldest unpinned turn is evicted while the
/// estimate exceeds `max_tokens` and more than one turn remains.
#[derive(Debug, Clone)]
pub struct DynamicWindowMemory {
    log: TurnLog,
    max_tokens: usize,
}

impl DynamicWindowMemory {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            log: TurnLog::default(),
            max_tokens,
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Current token estimate of the retained turns.
    pub fn token_count(&self) -> usize {
        estimate_messages_tokens(&self.log.messages)
    }

    fn prune_to_fit(&mut self) {
        let mut total = self.token_count();
        while total > self.max_tokens && self.log.messages.len() > 1 {
            let Some(evicted) = self.log.evict_oldest() else {
                break;
            };
            total -= estimate_tokens(&evicted.content);
            debug!(role = %evicted.role, remaining = total, "Evicted turn from dynamic window");
        }
    }
}

impl Default for DynamicWindowMemory {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl ConversationMemory for DynamicWindowMemory {
    fn name(&self) -> &str {
        "dynamic"
    }

    fn add_message(&mut self, message: Message) {
        self.log.push(message, false);
        self.prune_to_fit();
    }

    fn add_pinned(&mut self, message: Message) {
        self.log.push(message, true);
        self.prune_to_fit();
    }

    fn messages(&self) -> &[Message] {
        &self.log.messages
    }

    fn clear(&mut self) {
        self.log.clear();
    }

    fn replace_messages(&mut self, messages: Vec<Message>, pinned_ids: &[String]) {
        self.log.replace(messages, pinned_ids);
        self.prune_to_fit();
    }

    fn pin(&mut self, index: usize) -> Result<(), MemoryError> {
        self.log.pin(index)
    }

    fn pinned_ids(&self) -> Vec<String> {
        self.log.pinned_ids()
    }
}

/// Keeps the newest `window_size` unpinned turns plus every pinned turn.
#[derive(Debug, Clone)]
pub struct FixedWindowMemory {
    log: TurnLog,
    window_size: usize,
}

impl FixedWindowMemory {
    pub fn new(window_size: usize) -> Self {
        Self {
            log: TurnLog::default(),
            window_size,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    fn prune_to_fit(&mut self) {
        let mut unpinned = self
            .log
            .messages
            .iter()
            .filter(|m| !self.log.is_pinned(m))
            .count();
        while unpinned > self.window_size {
            if self.log.evict_oldest().is_none() {
                break;
            }
            unpinned -= 1;
        }
    }
}

impl Default for FixedWindowMemory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ConversationMemory for FixedWindowMemory {
    fn name(&self) -> &str {
        "fixed"
    }

    fn add_message(&mut self, message: Message) {
        self.log.push(message, false);
        self.prune_to_fit();
    }

    fn add_pinned(&mut self, message: Message) {
        self.log.push(message, true);
        self.prune_to_fit();
    }

    fn messages(&self) -> &[Message] {
        &self.log.messages
    }

    fn clear(&mut self) {
        self.log.clear();
    }

    fn replace_messages(&mut self, messages: Vec<Message>, pinned_ids: &[String]) {
        self.log.replace(messages, pinned_ids);
        self.prune_to_fit();
    }

    fn pin(&mut self, index: usize) -> Result<(), MemoryError> {
        self.log.pin(index)
    }

    fn pinned_ids(&self) -> Vec<String> {
        self.log.pinned_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(memory: &dyn ConversationMemory) -> Vec<&str> {
        memory.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn dynamic_window_evicts_oldest_over_budget() {
        // Each 8-char turn costs 2 tokens; budget fits two.
        let mut memory = DynamicWindowMemory::new(4);
        memory.add_message(Message::user("turn-one"));
        memory.add_message(Message::assistant("turn-two"));
        memory.add_message(Message::user("turn-333"));
        assert_eq!(contents(&memory), vec!["turn-two", "turn-333"]);
        assert_eq!(memory.token_count(), 4);
    }

    #[test]
    fn dynamic_window_keeps_last_turn_even_if_oversized() {
        let mut memory = DynamicWindowMemory::new(1);
        memory.add_message(Message::user("a much longer message than the budget"));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn dynamic_window_never_evicts_pinned() {
        let mut memory = DynamicWindowMemory::new(6);
        memory.add_message(Message::system("instruct"));
        memory.pin(0).unwrap();
        memory.add_message(Message::user("question"));
        memory.pin(1).unwrap();
        memory.add_message(Message::assistant("answer-1"));
        memory.add_message(Message::assistant("answer-2"));
        assert_eq!(contents(&memory), vec!["instruct", "question", "answer-2"]);
        assert_eq!(memory.pinned_ids().len(), 2);
    }

    #[test]
    fn dynamic_window_pins_before_pruning() {
        let mut memory = DynamicWindowMemory::new(10);
        memory.add_pinned(Message::system("instructions"));
        memory.add_pinned(Message::user("x".repeat(200)));
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.pinned_ids().len(), 2);
    }

    #[test]
    fn dynamic_window_keeps_oversized_newest_turn() {
        let mut memory = DynamicWindowMemory::new(4);
        memory.add_pinned(Message::system("instruct"));
        memory.add_message(Message::user("y".repeat(100)));
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.pinned_ids().len(), 1);

        memory.add_message(Message::assistant("ok"));
        assert_eq!(contents(&memory), vec!["instruct", "ok"]);
    }

    #[test]
    fn fixed_window_keeps_newest() {
        let mut memory = FixedWindowMemory::new(2);
        for text in ["a", "b", "c", "d"] {
            memory.add_message(Message::user(text));
        }
        assert_eq!(contents(&memory), vec!["c", "d"]);
    }

    #[test]
    fn fixed_window_pins_do_not_count() {
        let mut memory = FixedWindowMemory::new(2);
        memory.add_message(Message::system("sys"));
        memory.pin(0).unwrap();
        for text in ["a", "b", "c"] {
            memory.add_message(Message::user(text));
        }
        assert_eq!(contents(&memory), vec!["sys", "b", "c"]);
    }

    #[test]
    fn pin_out_of_range() {
        let mut memory = FixedWindowMemory::new(2);
        let err = memory.pin(3).unwrap_err();
        assert!(matches!(err, MemoryError::IndexOutOfRange { index: 3, len: 0 }));
    }

    #[test]
    fn replace_prunes_and_restores_pins() {
        let messages: Vec<Message> = ["sys", "a", "b", "c"]
            .into_iter()
            .map(Message::user)
            .collect();
        let pinned = vec![messages[0].id.clone()];

        let mut memory = FixedWindowMemory::new(2);
        memory.replace_messages(messages, &pinned);
        assert_eq!(contents(&memory), vec!["sys", "b", "c"]);
        assert_eq!(memory.pinned_ids(), pinned);
    }

    #[test]
    fn clear_drops_pins() {
        let mut memory = DynamicWindowMemory::default();
        memory.add_message(Message::system("sys"));
        memory.pin(0).unwrap();
        memory.clear();
        assert!(memory.is_empty());
        assert!(memory.pinned_ids().is_empty());
    }
}

//! Token estimation for the conversation window.
//!
//! Uses a character-based heuristic: ~4 characters per token, rounded up.
//! Counting is per Unicode scalar value, so multi-byte text is not
//! over-counted.

use reagent_core::message::Message;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for a slice of messages (content only).
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

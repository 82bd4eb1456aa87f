//! Domain events published while a run progresses.
//!
//! The agent loop announces what it does on an [`EventBus`]; observers
//! (the CLI's verbose mode, tests, embedding applications) subscribe
//! without the loop knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A run started on a new task
    RunStarted {
        task_id: String,
        task: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        task_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A malformed response triggered a correction round-trip
    FormatCorrected {
        task_id: String,
        missing: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The same action was repeated with the same input
    LoopDetected {
        task_id: String,
        action_name: String,
        /// Whether the recovery budget was already spent
        terminal: bool,
        timestamp: DateTime<Utc>,
    },

    /// A run reached a terminal state
    RunFinished {
        task_id: String,
        success: bool,
        iterations: usize,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

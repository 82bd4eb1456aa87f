//! Error types for the reagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`ErrorKind`] gives every
//! failure a stable name so callers never have to match on error identity
//! to decide whether a run can continue.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all reagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Provider(_) => ErrorKind::Model,
            Error::Tool(e) => e.kind(),
            Error::Memory(_) => ErrorKind::Memory,
            Error::Config { .. } => ErrorKind::Config,
            Error::Serialization(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Named classification of every failure condition the agent loop knows.
///
/// `MalformedResponse`, `LoopDetected` and `SafetyCeilingReached` never
/// travel as an [`Error`]; they describe how a run recovered or terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The language-model call itself failed.
    Model,
    /// The model asked for a tool that is not registered.
    ToolNotFound,
    /// The tool rejected its input.
    ToolValidation,
    /// The tool failed (or timed out, or panicked) while running.
    ToolExecution,
    /// The model output was missing protocol markers.
    MalformedResponse,
    /// The model repeated the same action with the same input.
    LoopDetected,
    /// The iteration ceiling was hit without a final answer.
    SafetyCeilingReached,
    Config,
    Memory,
    Internal,
}

impl ErrorKind {
    /// Whether this condition aborts a run with an error instead of being
    /// folded back into the conversation.
    ///
    /// `ToolNotFound` is fatal under the default unknown-tool policy; the
    /// `Observe` policy downgrades it at the call site.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::Model
                | ErrorKind::ToolNotFound
                | ErrorKind::Config
                | ErrorKind::Memory
                | ErrorKind::Internal
        )
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned no completion")]
    EmptyResponse,
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Tool name is reserved by the loop protocol: {0}")]
    ReservedName(String),

    #[error("Invalid input for tool '{tool_name}': {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool '{tool_name}' timed out after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Tool '{tool_name}' panicked")]
    Panicked { tool_name: String },
}

impl ToolError {
    /// Shorthand used by tool implementations to report a failure.
    pub fn execution(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand used by tool implementations to reject their input.
    pub fn invalid(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound(_) => ErrorKind::ToolNotFound,
            ToolError::InvalidArguments { .. } => ErrorKind::ToolValidation,
            ToolError::ExecutionFailed { .. }
            | ToolError::Timeout { .. }
            | ToolError::Panicked { .. } => ErrorKind::ToolExecution,
            ToolError::AlreadyRegistered(_) | ToolError::ReservedName(_) => ErrorKind::Config,
        }
    }

    /// The message shown to the model as an observation.
    ///
    /// Execution failures surface the tool's own reason verbatim; every
    /// other variant uses its display form.
    pub fn observation_message(&self) -> String {
        match self {
            ToolError::ExecutionFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Failed to encode memory snapshot: {0}")]
    Encode(String),

    #[error("Failed to decode memory snapshot: {0}")]
    Decode(String),

    #[error("Turn index out of range: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

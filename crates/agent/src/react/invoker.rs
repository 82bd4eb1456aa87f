//! Tool invoker — runs a requested action against the registry and turns
//! whatever happens into an observation.
//!
//! Tools are untrusted: validation failures, execution errors, panics and
//! timeouts all become `{"error": ...}` observations. The only error that
//! leaves [`ToolInvoker::invoke`] is an unknown tool name, so the caller
//! can apply its unknown-tool policy.

use std::sync::Arc;
use std::time::Duration;

use reagent_core::error::ToolError;
use reagent_core::tool::ToolRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::parser::ActionInput;

/// The result of running an action, as shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Error { error: String },
    Value(Value),
}

impl Observation {
    pub fn error(message: impl Into<String>) -> Self {
        Observation::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Observation::Error { .. })
    }

    /// Compact JSON text for the prompt.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".into())
    }
}

impl From<ToolError> for Observation {
    fn from(err: ToolError) -> Self {
        Observation::error(err.observation_message())
    }
}

pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Abandon tools that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run `name` with `input`.
    ///
    /// Returns `Err(ToolError::NotFound)` for an unregistered name; every
    /// other outcome is an [`Observation`].
    pub async fn invoke(&self, name: &str, input: &ActionInput) -> Result<Observation, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let input = input.to_value();
        if let Err(e) = self.registry.validate_arguments(name, &input) {
            warn!(tool = %name, error = %e, "Tool input rejected");
            return Ok(e.into());
        }

        // Spawned so a panicking tool surfaces as a JoinError.
        let handle = tokio::spawn(async move { tool.execute(input).await });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Dropping the handle detaches the task; its result is discarded.
                    let err = ToolError::Timeout {
                        tool_name: name.to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    };
                    warn!(tool = %name, "Tool timed out");
                    return Ok(err.into());
                }
            },
            None => handle.await,
        };

        let observation = match joined {
            Ok(Ok(value)) => {
                debug!(tool = %name, "Tool succeeded");
                Observation::Value(value)
            }
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool failed");
                e.into()
            }
            Err(join_err) => {
                warn!(tool = %name, error = %join_err, "Tool task aborted");
                ToolError::Panicked {
                    tool_name: name.to_string(),
                }
                .into()
            }
        };
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, FailingTool, PanickingTool, SlowTool};
    use serde_json::json;

    fn invoker() -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        registry.register(Arc::new(FailingTool::new("disk full"))).unwrap();
        registry.register(Arc::new(PanickingTool)).unwrap();
        registry.register(Arc::new(SlowTool)).unwrap();
        ToolInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn successful_tool_returns_value() {
        let obs = invoker()
            .invoke("echo", &ActionInput::Structured(json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(obs, Observation::Value(json!({"echo": "hi"})));
        assert_eq!(obs.render(), r#"{"echo":"hi"}"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let err = invoker()
            .invoke("nonexistent_tool", &ActionInput::Structured(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "nonexistent_tool"));
    }

    #[tokio::test]
    async fn failure_becomes_error_observation() {
        let obs = invoker()
            .invoke("fail", &ActionInput::Structured(json!({})))
            .await
            .unwrap();
        assert_eq!(obs, Observation::error("disk full"));
        assert_eq!(obs.render(), r#"{"error":"disk full"}"#);
    }

    #[tokio::test]
    async fn invalid_input_becomes_error_observation() {
        let obs = invoker()
            .invoke("echo", &ActionInput::Structured(json!({"other": 1})))
            .await
            .unwrap();
        match obs {
            Observation::Error { error } => assert!(error.contains("missing required field 'text'")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn raw_input_fails_object_schema() {
        let obs = invoker()
            .invoke("echo", &ActionInput::Raw("hello".into()))
            .await
            .unwrap();
        assert!(obs.is_error());
    }

    #[tokio::test]
    async fn panic_becomes_error_observation() {
        let obs = invoker()
            .invoke("panic", &ActionInput::Structured(json!({})))
            .await
            .unwrap();
        assert_eq!(obs, Observation::error("Tool 'panic' panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let obs = invoker()
            .with_timeout(Some(Duration::from_millis(50)))
            .invoke("slow", &ActionInput::Structured(json!({})))
            .await
            .unwrap();
        assert_eq!(obs, Observation::error("Tool 'slow' timed out after 50ms"));
    }

    #[test]
    fn error_value_observation_deserializes_as_error() {
        let obs: Observation = serde_json::from_value(json!({"error": "x"})).unwrap();
        assert!(obs.is_error());
        let obs: Observation = serde_json::from_value(json!({"result": 4})).unwrap();
        assert!(!obs.is_error());
    }
}

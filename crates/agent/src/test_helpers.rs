//! Shared test helpers: a scripted provider and a handful of tools.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reagent_core::error::{ProviderError, ToolError};
use reagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use reagent_core::tool::Tool;
use serde_json::{Value, json};

/// A provider that returns scripted completions in order and records every
/// request it receives.
///
/// When the script runs out it repeats the fallback if one is set, and
/// panics otherwise.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn repeating(text: &str) -> Self {
        let mut provider = Self::new(Vec::<String>::new());
        provider.fallback = Some(text.to_string());
        provider
    }

    /// Fail the first call with `err`.
    pub fn failing(err: ProviderError) -> Self {
        let provider = Self::new(Vec::<String>::new());
        provider.script.lock().unwrap().push_back(Err(err));
        provider
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every system turn of the `n`th request, joined by newlines.
    pub fn system_text(&self, n: usize) -> String {
        self.requests()[n]
            .messages
            .iter()
            .filter(|m| m.role == reagent_core::Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The last (user prompt) turn of the `n`th request.
    pub fn prompt(&self, n: usize) -> String {
        self.requests()[n]
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let call = self.requests.lock().unwrap().len();
        self.requests.lock().unwrap().push(request);

        let next = self.script.lock().unwrap().pop_front();
        let content = match (next, &self.fallback) {
            (Some(result), _) => result?,
            (None, Some(text)) => text.clone(),
            (None, None) => panic!("ScriptedProvider: no response scripted for call #{call}"),
        };

        Ok(ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// Echoes its `text` field back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the given text."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }))
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        Ok(json!({"echo": input["text"]}))
    }
}

/// Accepts anything and always succeeds.
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Searches for a query."
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        Ok(json!({"results": [format!("result for {input}")]}))
    }
}

/// Always fails with the given reason.
pub struct FailingTool {
    reason: String,
}

impl FailingTool {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        Err(ToolError::execution("fail", self.reason.clone()))
    }
}

pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panic"
    }

    fn description(&self) -> &str {
        "Panics."
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        panic!("tool blew up");
    }
}

/// Sleeps for a minute before answering.
pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Takes a long time."
    }

    async fn execute(&self, _input: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(json!("done"))
    }
}

//! Immutable per-run configuration.
//!
//! Built once from [`AppConfig`] (or by hand) and passed to each run; a
//! run never changes its own mode or limits.

use std::time::Duration;

use reagent_config::{AgentMode, AppConfig, UnknownToolPolicy};
use reagent_core::provider::GenerationOptions;

/// Limits and policies for the ReAct loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Safety ceiling on iterations.
    pub max_iterations: usize,
    pub tool_timeout: Option<Duration>,
    pub unknown_tool: UnknownToolPolicy,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tool_timeout: None,
            unknown_tool: UnknownToolPolicy::Fatal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub mode: AgentMode,
    pub model: String,
    pub options: GenerationOptions,
    pub loop_settings: LoopSettings,
}

impl RunConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            mode: AgentMode::React,
            model: model.into(),
            options: GenerationOptions::default(),
            loop_settings: LoopSettings::default(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        let agent = &config.agent;
        Self {
            mode: agent.mode,
            model: config.default_model.clone(),
            options: GenerationOptions {
                temperature: agent.temperature,
                max_tokens: agent.max_tokens,
                top_p: agent.top_p,
                presence_penalty: agent.presence_penalty,
                frequency_penalty: agent.frequency_penalty,
                ..GenerationOptions::default()
            },
            loop_settings: LoopSettings {
                max_iterations: config.react.max_iterations,
                tool_timeout: config.react.tool_timeout_secs.map(Duration::from_secs),
                unknown_tool: config.react.unknown_tool,
            },
        }
    }

    pub fn with_mode(mut self, mode: AgentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.loop_settings.max_iterations = max_iterations;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.loop_settings.tool_timeout = timeout;
        self
    }

    pub fn with_unknown_tool(mut self, policy: UnknownToolPolicy) -> Self {
        self.loop_settings.unknown_tool = policy;
        self
    }
}

//! Configuration loading, validation, and management for reagent.
//!
//! Loads configuration from `~/.reagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.reagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Base URL override for the default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Agent profile and sampling settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// ReAct loop settings
    #[serde(default)]
    pub react: ReactConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("base_url", &self.base_url)
            .field("agent", &self.agent)
            .field("react", &self.react)
            .field("memory", &self.memory)
            .field("providers", &self.providers)
            .finish()
    }
}

/// Per-provider settings under `[providers.<name>]`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// How the agent answers a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// One model call per message, no tools.
    Chat,
    /// Reason-act-observe loop with tools.
    #[default]
    React,
    /// Pick chat or react per message from the message's tool intent.
    Auto,
}

impl std::str::FromStr for AgentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(AgentMode::Chat),
            "react" => Ok(AgentMode::React),
            "auto" => Ok(AgentMode::Auto),
            other => Err(ConfigError::ValidationError(format!(
                "unknown agent mode '{other}' (expected 'chat', 'react' or 'auto')"
            ))),
        }
    }
}

/// What a run does when the model names a tool that is not registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownToolPolicy {
    /// Abort the run with a tool-not-found error.
    #[default]
    Fatal,
    /// Report the error to the model as an observation and continue.
    Observe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// System instructions given to the model at the start of every conversation
    #[serde(default = "default_instructions")]
    pub instructions: String,

    #[serde(default)]
    pub mode: AgentMode,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

fn default_agent_name() -> String {
    "reagent".into()
}
fn default_instructions() -> String {
    "You are a helpful assistant. Answer accurately and concisely, and use the available tools when they help."
        .into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: default_instructions(),
            mode: AgentMode::default(),
            temperature: default_temperature(),
            max_tokens: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactConfig {
    /// Safety ceiling on loop iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Per-tool execution timeout; unset means tools may run indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,

    #[serde(default)]
    pub unknown_tool: UnknownToolPolicy,
}

fn default_max_iterations() -> usize {
    50
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_timeout_secs: None,
            unknown_tool: UnknownToolPolicy::default(),
        }
    }
}

/// Eviction strategy for the conversation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStrategy {
    /// Evict by estimated token count.
    #[default]
    Dynamic,
    /// Keep a fixed number of turns.
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub strategy: MemoryStrategy,

    /// Token budget for the dynamic window
    #[serde(default = "default_memory_tokens")]
    pub max_tokens: usize,

    /// Turn count for the fixed window
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_memory_tokens() -> usize {
    4096
}
fn default_window_size() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            strategy: MemoryStrategy::default(),
            max_tokens: default_memory_tokens(),
            window_size: default_window_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.reagent/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `REAGENT_API_KEY` (highest priority), then `OPENAI_API_KEY` /
    ///   `ANTHROPIC_API_KEY` for the matching provider
    /// - `REAGENT_PROVIDER`
    /// - `REAGENT_MODEL`, then `MODEL`
    /// - `OPENAI_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("REAGENT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(key) = lookup("REAGENT_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            let vendor_var = match self.default_provider.as_str() {
                "anthropic" => "ANTHROPIC_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            self.api_key = lookup(vendor_var);
        }

        if let Some(model) = lookup("REAGENT_MODEL").or_else(|| lookup("MODEL")) {
            self.default_model = model;
        }

        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reagent")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let agent = &self.agent;
        if !(0.0..=2.0).contains(&agent.temperature) {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if let Some(top_p) = agent.top_p
            && !(top_p > 0.0 && top_p <= 1.0)
        {
            return Err(ConfigError::ValidationError(
                "agent.top_p must be in (0.0, 1.0]".into(),
            ));
        }

        for (name, penalty) in [
            ("presence_penalty", agent.presence_penalty),
            ("frequency_penalty", agent.frequency_penalty),
        ] {
            if let Some(p) = penalty
                && !(-2.0..=2.0).contains(&p)
            {
                return Err(ConfigError::ValidationError(format!(
                    "agent.{name} must be between -2.0 and 2.0"
                )));
            }
        }

        if self.react.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "react.max_iterations must be at least 1".into(),
            ));
        }

        if self.react.tool_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "react.tool_timeout_secs must be at least 1 when set".into(),
            ));
        }

        if self.memory.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_tokens must be at least 1".into(),
            ));
        }

        if self.memory.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "memory.window_size must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `reagent config --default`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            base_url: None,
            agent: AgentConfig::default(),
            react: ReactConfig::default(),
            memory: MemoryConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.react.max_iterations, 50);
        assert_eq!(config.react.unknown_tool, UnknownToolPolicy::Fatal);
        assert!(config.react.tool_timeout_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.memory.max_tokens, config.memory.max_tokens);
        assert_eq!(parsed.agent.mode, AgentMode::React);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_sampling_ranges_rejected() {
        let mut config = AppConfig::default();
        config.agent.top_p = Some(0.0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.frequency_penalty = Some(2.5);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.react.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.memory.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn load_from_file_parses_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"

[agent]
mode = "chat"
temperature = 0.2
top_p = 0.9

[react]
max_iterations = 12
tool_timeout_secs = 30
unknown_tool = "observe"

[memory]
strategy = "fixed"
window_size = 6

[providers.anthropic]
api_key = "sk-ant-test"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.agent.mode, AgentMode::Chat);
        assert_eq!(config.agent.top_p, Some(0.9));
        assert_eq!(config.react.max_iterations, 12);
        assert_eq!(config.react.tool_timeout_secs, Some(30));
        assert_eq!(config.react.unknown_tool, UnknownToolPolicy::Observe);
        assert_eq!(config.memory.strategy, MemoryStrategy::Fixed);
        assert_eq!(config.memory.window_size, 6);
        assert_eq!(config.memory.max_tokens, 4096);
        assert_eq!(
            config.providers["anthropic"].api_key.as_deref(),
            Some("sk-ant-test")
        );
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[react\nmax_iterations = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_take_priority() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env_from(&[
            ("REAGENT_API_KEY", "from-env"),
            ("MODEL", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:11434/v1"));
    }

    #[test]
    fn vendor_key_fills_missing_api_key() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env_from(&[
            ("REAGENT_PROVIDER", "anthropic"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]));
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn reagent_model_beats_model() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env_from(&[("REAGENT_MODEL", "a"), ("MODEL", "b")]));
        assert_eq!(config.default_model, "a");
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-secret-value".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other-secret".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(!debug.contains("sk-other-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn agent_mode_from_str() {
        assert_eq!("chat".parse::<AgentMode>().unwrap(), AgentMode::Chat);
        assert_eq!("ReAct".parse::<AgentMode>().unwrap(), AgentMode::React);
        assert_eq!("AUTO".parse::<AgentMode>().unwrap(), AgentMode::Auto);
        assert!("plan".parse::<AgentMode>().is_err());
    }

    #[test]
    fn auto_mode_from_toml() {
        let config: AppConfig = toml::from_str("[agent]\nmode = \"auto\"\n").unwrap();
        assert_eq!(config.agent.mode, AgentMode::Auto);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("max_iterations = 50"));
    }
}

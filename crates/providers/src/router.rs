//! Provider router — builds providers from configuration and picks the
//! one a run talks to.

use std::collections::HashMap;
use std::sync::Arc;

use reagent_config::AppConfig;
use reagent_core::error::ProviderError;
use reagent_core::provider::Provider;
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Named providers plus the default one.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build every configured provider, plus the default one if it has no
/// `[providers.<name>]` section.
pub fn build_router(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone());
        let base_url = provider_config
            .api_url
            .clone()
            .or_else(|| {
                (name == &config.default_provider)
                    .then(|| config.base_url.clone())
                    .flatten()
            });
        router.register(name.clone(), build_one(name, api_key, base_url)?);
    }

    if router.default_provider().is_none() {
        let provider = build_one(
            &config.default_provider,
            config.api_key.clone(),
            config.base_url.clone(),
        )?;
        router.register(config.default_provider.clone(), provider);
    }

    debug!(providers = ?router.list(), default = %config.default_provider, "Built provider router");
    Ok(router)
}

/// Build the configured default provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    build_router(config)?
        .default_provider()
        .ok_or_else(|| ProviderError::NotConfigured(config.default_provider.clone()))
}

fn build_one(
    name: &str,
    api_key: Option<String>,
    base_url: Option<String>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = match api_key {
        Some(key) => key,
        None if is_local(name) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}'"
            )));
        }
    };

    if name == "anthropic" {
        let mut provider = AnthropicProvider::new(api_key);
        if let Some(url) = base_url {
            provider = provider.with_base_url(url);
        }
        return Ok(Arc::new(provider));
    }

    let base_url = base_url.unwrap_or_else(|| default_base_url(name));
    Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Self-hosted servers that need no API key.
fn is_local(name: &str) -> bool {
    matches!(name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

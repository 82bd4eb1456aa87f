//! `reagent config` — print the effective configuration.

use std::path::PathBuf;

use reagent_config::AppConfig;

const REDACTED: &str = "***";

pub fn run(default: bool, path: Option<PathBuf>) -> anyhow::Result<()> {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = super::load_config(path.as_deref())?;
    let source = path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    println!("# {}", source.display());
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

fn redacted(mut config: AppConfig) -> AppConfig {
    if config.api_key.is_some() {
        config.api_key = Some(REDACTED.into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(REDACTED.into());
        }
    }
    config
}

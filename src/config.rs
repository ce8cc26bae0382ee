//! Runtime configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! environment variables. The completion API key is env-only
//! (`COMPLETION_API_KEY`) and is never read from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// When set, CORS allows exactly this origin; otherwise any origin.
    #[serde(default)]
    pub client_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            client_origin: None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:4000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            model: default_model(),
            timeout_secs: default_completion_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_completion_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "openai/gpt-oss-120b".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Redis URL. Unset or blank disables the response cache.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetcherConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

/// Load the config file (missing file means pure defaults), apply env
/// overrides, validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    if config.completion.base_url.trim().is_empty() {
        anyhow::bail!("completion.base_url must not be empty");
    }
    if config.completion.model.trim().is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }
    if config.completion.timeout_secs == 0 {
        anyhow::bail!("completion.timeout_secs must be > 0");
    }
    if config.fetcher.timeout_secs == 0 {
        anyhow::bail!("fetcher.timeout_secs must be > 0");
    }

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(bind) = env_nonblank("BIND_ADDR") {
        config.server.bind = bind;
    }
    if let Some(origin) = env_nonblank("CLIENT_ORIGIN") {
        config.server.client_origin = Some(origin);
    }
    if let Some(url) = env_nonblank("COMPLETION_API_URL") {
        config.completion.base_url = url;
    }
    if let Some(model) = env_nonblank("COMPLETION_MODEL") {
        config.completion.model = model;
    }
    config.completion.api_key = env_nonblank("COMPLETION_API_KEY");
    if let Some(url) = env_nonblank("REDIS_URL") {
        config.cache.url = Some(url);
    }
}

fn env_nonblank(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

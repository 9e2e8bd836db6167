//! Pipeline configuration
//!
//! One flat, TOML-loadable struct covering crawl, aggregation and
//! extraction settings. Every key is optional; missing keys take defaults.
//!
//! ```toml
//! max_pages = 8
//! crawl_mode = "frontier"
//! summary_mode = "map-reduce"
//! fetch_timeout_secs = 15
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use enrich_agents::{
    create_anthropic_backend, create_backend, AggregateConfig, AnthropicConfig,
    OpenAIBackendConfig, SharedBackend, SummaryMode, DEFAULT_CHAR_BUDGET, DEFAULT_CHUNK_CHARS,
};
use enrich_core::DEFAULT_MAX_PAGES;
use enrich_web::{CrawlConfig, CrawlMode, FetchConfig};

use crate::PipelineError;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for one enrichment run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pages to attempt (clamped to 1-10 by the crawler)
    pub max_pages: usize,
    pub crawl_mode: CrawlMode,
    /// Concurrent fetches in priority mode
    pub max_concurrent: usize,
    pub fetch_timeout_secs: u64,
    pub user_agent: Option<String>,
    /// HTTP or SOCKS5 proxy URL
    pub proxy: Option<String>,
    pub summary_mode: SummaryMode,
    pub char_budget: usize,
    pub chunk_chars: usize,
    /// Temperature for every model call
    pub temperature: f32,
    /// Fill missing social/contact fields from crawled signals
    pub backfill_signals: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            crawl_mode: CrawlMode::default(),
            max_concurrent: 1,
            fetch_timeout_secs: 10,
            user_agent: None,
            proxy: None,
            summary_mode: SummaryMode::default(),
            char_budget: DEFAULT_CHAR_BUDGET,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            temperature: 0.1,
            backfill_signals: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let mut fetch = FetchConfig::default().with_timeout(self.fetch_timeout_secs);
        if let Some(user_agent) = &self.user_agent {
            fetch = fetch.with_user_agent(user_agent);
        }
        if let Some(proxy) = &self.proxy {
            fetch = fetch.with_proxy(proxy);
        }
        fetch
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::default()
            .with_mode(self.crawl_mode)
            .with_max_pages(self.max_pages)
            .with_max_concurrent(self.max_concurrent)
            .with_fetch(self.fetch_config())
    }

    pub fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            summary_mode: self.summary_mode,
            char_budget: self.char_budget,
            chunk_chars: self.chunk_chars,
            temperature: self.temperature,
        }
    }
}

/// Language-model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Anthropic,
    OpenAI,
    OpenRouter,
}

impl Provider {
    /// Environment variable holding this provider's API key
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-20250514",
            Provider::OpenAI => "gpt-4o-mini",
            Provider::OpenRouter => "openai/gpt-4o-mini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("Anthropic"),
            Provider::OpenAI => f.write_str("OpenAI"),
            Provider::OpenRouter => f.write_str("OpenRouter"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Build the shared backend for a provider.
///
/// A missing or blank key is [`PipelineError::MissingCredential`]; callers
/// resolve credentials before any crawl starts.
pub fn build_backend(
    provider: Provider,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Result<SharedBackend, PipelineError> {
    let key = api_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| PipelineError::MissingCredential(provider.env_var().to_string()))?;
    let model = model.unwrap_or(provider.default_model());

    let backend = match provider {
        Provider::Anthropic => create_anthropic_backend(AnthropicConfig::new(key, model)),
        Provider::OpenAI => create_backend(OpenAIBackendConfig::openai(key, model)),
        Provider::OpenRouter => create_backend(OpenAIBackendConfig::openrouter(key, model)),
    };

    backend.map_err(PipelineError::Backend)
}

//! Per-tool configuration files.
//!
//! Each tool reads `<config_dir>/<tool>.yaml`. A missing file means the
//! tool runs with defaults.

use crate::error::{Result, ToolgateError};
use crate::ratelimit::RateLimitConfig;
use crate::utils::interpolate_env;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const WEB_SEARCH: &str = "web_search";
pub const URL_SCRAPER: &str = "url_scraper";

/// Configuration of both tools
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub url_scraper: UrlScraperConfig,
}

impl ToolsConfig {
    /// Load `web_search.yaml` and `url_scraper.yaml` from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            web_search: load_tool_file(dir, WEB_SEARCH)?.unwrap_or_default(),
            url_scraper: load_tool_file(dir, URL_SCRAPER)?.unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.web_search.rate_limit.validate(WEB_SEARCH)?;
        self.url_scraper.rate_limit.validate(URL_SCRAPER)?;
        if self.url_scraper.scraper.timeout == 0 {
            return Err(ToolgateError::config(
                "url_scraper: scraper.timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn load_tool_file<T: serde::de::DeserializeOwned>(dir: &Path, tool: &str) -> Result<Option<T>> {
    let path = dir.join(format!("{}.yaml", tool));
    if !path.exists() {
        tracing::debug!(tool, path = %path.display(), "No config file, using defaults");
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        ToolgateError::config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let parsed = serde_yaml::from_str(&content).map_err(|e| {
        ToolgateError::config(format!("Invalid YAML in {}: {}", path.display(), e))
    })?;

    tracing::info!(tool, path = %path.display(), "Loaded tool config");
    Ok(Some(parsed))
}

/// `web_search.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebSearchConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub api: SearchApiConfig,
    #[serde(default)]
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchApiConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    /// API key, either literal or a `${VAR}` placeholder
    #[serde(default = "default_gemini_key")]
    pub key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            key: default_gemini_key(),
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout: default_gemini_timeout(),
        }
    }
}

impl GeminiConfig {
    /// The API key with `${VAR}` placeholders resolved.
    pub fn resolved_key(&self) -> Option<String> {
        interpolate_env(&self.key)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    #[serde(default = "default_max_references")]
    pub max_references: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_references: default_max_references(),
        }
    }
}

/// `url_scraper.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UrlScraperConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub scraper: ScraperSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_scraper_timeout")]
    pub timeout: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_scraper_timeout(),
        }
    }
}

fn default_gemini_key() -> String {
    "${GEMINI_API_KEY}".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout() -> u64 {
    60
}

fn default_max_references() -> usize {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

fn default_scraper_timeout() -> u64 {
    30
}

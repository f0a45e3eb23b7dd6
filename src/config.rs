use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Result, ToolgateError};
use crate::tools::ToolsConfig;
use crate::utils::get_env_with_prefix;

/// Main configuration for a toolgate server
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 1MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Shared secret every request must present in `X-API-Key`.
///
/// `None` means no key was configured, in which case every request is
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_key: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    32823
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable and file support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
    config_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            config_dir: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.auth.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Use these tool settings instead of reading YAML files.
    pub fn with_tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self.config_dir = None;
        self
    }

    /// Read `web_search.yaml` and `url_scraper.yaml` from `dir` on build.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Load configuration from environment variables with TOOLGATE_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = get_env_with_prefix("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(max_body_size) = get_env_with_prefix("MAX_BODY_SIZE") {
            if let Ok(size) = max_body_size.parse() {
                self.config.server.max_body_size = size;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(key) = get_env_with_prefix("API_KEY") {
            self.config.auth.api_key = Some(SecretString::from(key));
        }
        if let Some(dir) = get_env_with_prefix("CONFIG_DIR") {
            self.config_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns [`ToolgateError::Config`] if:
    /// - the server address (host:port) does not parse
    /// - the log level is unknown
    /// - the API key is set but blank
    /// - a tool config file is unreadable or invalid
    /// - a tool rate limit or timeout is zero
    pub fn build(mut self) -> Result<Config> {
        self.config.server.addr().map_err(|e| {
            ToolgateError::config(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(ToolgateError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.server.max_body_size == 0 {
            return Err(ToolgateError::config(
                "Maximum body size must be greater than 0",
            ));
        }

        match &self.config.auth.api_key {
            Some(key) if key.expose_secret().trim().is_empty() => {
                return Err(ToolgateError::config("API key must not be empty"));
            }
            Some(_) => {}
            None => {
                tracing::warn!("No API key configured, every request will be rejected");
            }
        }

        if let Some(dir) = &self.config_dir {
            self.config.tools = ToolsConfig::load_dir(dir)?;
        }
        self.config.tools.validate()?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use serde::{Deserialize, Serialize};

/// Per-tool rate limit: at most `max_requests` admissions in any trailing
/// window of `time_window_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Trailing window length in seconds
    #[serde(default = "default_time_window_seconds")]
    pub time_window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            time_window_seconds: default_time_window_seconds(),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, time_window_seconds: u64) -> Self {
        Self {
            max_requests,
            time_window_seconds,
        }
    }

    /// Create a new RateLimitConfig builder
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }

    /// Check that both limits are positive.
    pub fn validate(&self, tool: &str) -> crate::error::Result<()> {
        if self.max_requests == 0 {
            return Err(crate::error::ToolgateError::config(format!(
                "{}: rate_limit.max_requests must be greater than 0",
                tool
            )));
        }
        if self.time_window_seconds == 0 {
            return Err(crate::error::ToolgateError::config(format!(
                "{}: rate_limit.time_window_seconds must be greater than 0",
                tool
            )));
        }
        Ok(())
    }
}

/// Builder for RateLimitConfig
#[must_use = "builder does nothing until you call build()"]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl RateLimitConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RateLimitConfig::default(),
        }
    }

    pub fn max_requests(mut self, max: u32) -> Self {
        self.config.max_requests = max;
        self
    }

    pub fn time_window_seconds(mut self, seconds: u64) -> Self {
        self.config.time_window_seconds = seconds;
        self
    }

    pub fn build(self) -> RateLimitConfig {
        self.config
    }
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_max_requests() -> u32 {
    10
}

fn default_time_window_seconds() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.time_window_seconds, 60);
    }

    #[test]
    fn test_builder() {
        let config = RateLimitConfig::builder()
            .max_requests(200)
            .time_window_seconds(120)
            .build();

        assert_eq!(config, RateLimitConfig::new(200, 120));
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let config: RateLimitConfig = serde_yaml::from_str("max_requests: 3").unwrap();
        assert_eq!(config, RateLimitConfig::new(3, 60));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        assert!(RateLimitConfig::new(0, 60).validate("web_search").is_err());

        let err = RateLimitConfig::new(5, 0).validate("url_scraper").unwrap_err();
        assert!(err.to_string().contains("url_scraper"));
        assert!(err.to_string().contains("time_window_seconds"));

        assert!(RateLimitConfig::new(1, 1).validate("web_search").is_ok());
    }
}

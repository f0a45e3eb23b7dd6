use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, ToolgateError};
use crate::ratelimit::LimiterRegistry;
use crate::tools::{GeminiSearch, HttpScraper, ScrapeTool, SearchTool};

/// Application context for dependency injection and shared state
///
/// Holds the limiter registry shared by every rate-limit layer and the tool
/// adapters the handlers delegate to. Tools are optional so tests can wire
/// in only what they exercise.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<LimiterRegistry>,
    pub search: Option<Arc<dyn SearchTool>>,
    pub scraper: Option<Arc<dyn ScrapeTool>>,
}

impl AppContext {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(LimiterRegistry::new()),
            search: None,
            scraper: None,
        }
    }

    /// Builder pattern for constructing AppContext
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    /// Context with the Gemini search and HTTP scraper built from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::builder()
            .with_search(Arc::new(GeminiSearch::from_config(&config.tools.web_search)?))
            .with_scraper(Arc::new(HttpScraper::from_config(&config.tools.url_scraper)?))
            .build())
    }

    /// Get the search tool, returning an error if not configured
    pub fn search(&self) -> Result<&Arc<dyn SearchTool>> {
        self.search
            .as_ref()
            .ok_or_else(|| ToolgateError::internal("Search tool not configured"))
    }

    /// Get the scrape tool, returning an error if not configured
    pub fn scraper(&self) -> Result<&Arc<dyn ScrapeTool>> {
        self.scraper
            .as_ref()
            .ok_or_else(|| ToolgateError::internal("Scrape tool not configured"))
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("registry", &self.registry)
            .field("search", &self.search.is_some())
            .field("scraper", &self.scraper.is_some())
            .finish()
    }
}

/// Builder for AppContext with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppContextBuilder {
    registry: Option<Arc<LimiterRegistry>>,
    search: Option<Arc<dyn SearchTool>>,
    scraper: Option<Arc<dyn ScrapeTool>>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            search: None,
            scraper: None,
        }
    }

    /// Share an existing limiter registry
    pub fn with_registry(mut self, registry: Arc<LimiterRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchTool>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_scraper(mut self, scraper: Arc<dyn ScrapeTool>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    pub fn build(self) -> AppContext {
        AppContext {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(LimiterRegistry::new())),
            search: self.search,
            scraper: self.scraper,
        }
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

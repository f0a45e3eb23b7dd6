//! Tool adapters: web search and URL scraping.
//!
//! Adapters report logical failures in their result envelope; the HTTP
//! layer maps those to 400 and any `Err` to 500.

mod config;
mod envelope;
mod grounding;
pub mod markdown;
mod scrape;
mod search;
mod url;

pub use config::{
    GeminiConfig, ScraperSettings, SearchApiConfig, SearchSettings, ToolsConfig, URL_SCRAPER,
    UrlScraperConfig, WEB_SEARCH, WebSearchConfig,
};
pub use envelope::{Envelope, Reference, ScrapeOutcome, SearchData, SearchOutcome, Status};
pub use grounding::{
    GroundingMetadata, LinkResolver, ResolveLink, ResolvedLink, extract_references, extract_title,
};
pub use scrape::{HttpScraper, PageRenderer, ScrapeTool};
pub use search::{GeminiSearch, SearchTool};
pub use url::clean_url;

/// Build an adapter's HTTP client, failing on settings reqwest rejects.
fn build_client(builder: reqwest::ClientBuilder) -> crate::error::Result<reqwest::Client> {
    builder
        .build()
        .map_err(|e| crate::error::ToolgateError::config(format!("HTTP client: {}", e)))
}

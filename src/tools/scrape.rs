//! URL scraping to markdown.

use super::config::{ScraperSettings, UrlScraperConfig};
use super::envelope::ScrapeOutcome;
use super::markdown::html_to_markdown;
use super::url::clean_url;
use super::build_client;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A page scraping backend.
///
/// Fetch and conversion failures come back as an error envelope. `Err` is
/// reserved for unexpected failures.
#[async_trait]
pub trait ScrapeTool: Send + Sync {
    async fn scrape(&self, url: &str, render_js: bool) -> anyhow::Result<ScrapeOutcome>;
}

/// Produces the HTML of a page after running its scripts.
///
/// Browser automation lives outside this crate; plug an implementation into
/// [`HttpScraper::with_renderer`] to serve `render_js` requests.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, settings: &ScraperSettings) -> anyhow::Result<String>;
}

/// [`ScrapeTool`] fetching pages with a plain HTTP GET.
#[derive(Clone)]
pub struct HttpScraper {
    client: reqwest::Client,
    settings: ScraperSettings,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl std::fmt::Debug for HttpScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScraper")
            .field("settings", &self.settings)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl HttpScraper {
    /// Fails when reqwest rejects the settings, e.g. a user agent that is
    /// not a valid header value.
    pub fn new(settings: ScraperSettings) -> Result<Self> {
        let client = build_client(
            reqwest::Client::builder()
                .user_agent(settings.user_agent.clone())
                .timeout(Duration::from_secs(settings.timeout)),
        )?;

        Ok(Self {
            client,
            settings,
            renderer: None,
        })
    }

    pub fn from_config(config: &UrlScraperConfig) -> Result<Self> {
        Self::new(config.scraper.clone())
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            anyhow::bail!("HTTP {}", status.as_u16());
        }
        Ok(response.text().await?)
    }

    async fn render(&self, url: &str) -> ScrapeOutcome {
        let Some(renderer) = &self.renderer else {
            return ScrapeOutcome::error("JavaScript rendering is not available");
        };

        match renderer.render(url, &self.settings).await {
            Ok(html) => ScrapeOutcome::success(html_to_markdown(&html)),
            Err(e) => {
                tracing::warn!(url, error = %e, "Page rendering failed");
                ScrapeOutcome::error(format!("Renderer error: {}", e))
            }
        }
    }
}

#[async_trait]
impl ScrapeTool for HttpScraper {
    async fn scrape(&self, url: &str, render_js: bool) -> anyhow::Result<ScrapeOutcome> {
        let url = clean_url(url);
        if url.is_empty() {
            return Ok(ScrapeOutcome::error("No URL provided"));
        }
        tracing::info!(url = %url, render_js, "Scraping URL");

        if render_js {
            return Ok(self.render(&url).await);
        }

        Ok(match self.fetch(&url).await {
            Ok(html) => ScrapeOutcome::success(html_to_markdown(&html)),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Scrape failed");
                ScrapeOutcome::error(e.to_string())
            }
        })
    }
}

//! Web search backed by Gemini with Google Search grounding.

use super::config::WebSearchConfig;
use super::envelope::{SearchData, SearchOutcome};
use super::grounding::{GroundingMetadata, LinkResolver, ResolveLink, extract_references};
use super::build_client;
use crate::error::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Attempts made against the Gemini API before giving up.
const MAX_ATTEMPTS: u32 = 3;

/// A web search backend.
///
/// Logical failures (empty query, upstream errors) come back as an error
/// envelope. `Err` is reserved for unexpected failures.
#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<SearchOutcome>;
}

/// [`SearchTool`] calling the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiSearch {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
    max_references: usize,
    resolver: Arc<dyn ResolveLink>,
}

impl fmt::Debug for GeminiSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSearch")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_references", &self.max_references)
            .finish()
    }
}

impl GeminiSearch {
    pub fn from_config(config: &WebSearchConfig) -> Result<Self> {
        let gemini = &config.api.gemini;
        let client = build_client(
            reqwest::Client::builder().timeout(Duration::from_secs(gemini.timeout)),
        )?;

        Ok(Self {
            client,
            api_key: gemini.resolved_key().map(SecretString::from),
            model: gemini.model.clone(),
            base_url: gemini.base_url.trim_end_matches('/').to_string(),
            max_references: config.search.max_references,
            resolver: Arc::new(LinkResolver::new()?),
        })
    }

    /// Replace how citation links are followed.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ResolveLink>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    async fn generate(&self, query: &str, key: &SecretString) -> anyhow::Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": query }] }],
            "tools": [{ "google_search": {} }],
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            anyhow::bail!("Gemini API error ({}): {}", status.as_u16(), message);
        }

        Ok(response.json().await?)
    }

    async fn outcome(&self, query: &str, response: GenerateResponse) -> SearchOutcome {
        let Some(candidate) = response.candidates.into_iter().next() else {
            tracing::warn!("No candidates in Gemini response");
            return SearchOutcome::error("No response from Gemini");
        };
        // An empty metadata object still counts as grounded.
        let Some(metadata) = candidate.grounding_metadata else {
            tracing::warn!("No grounding metadata in Gemini response");
            return SearchOutcome::error("No grounding metadata in response");
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let references =
            extract_references(&metadata, self.resolver.as_ref(), self.max_references).await;
        tracing::info!(references = references.len(), "Search completed");

        SearchOutcome::success(SearchData {
            prompt: query.to_string(),
            search_query: metadata.web_search_queries,
            response: text,
            references,
        })
    }
}

#[async_trait]
impl SearchTool for GeminiSearch {
    async fn search(&self, query: &str) -> anyhow::Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome::error("No query provided"));
        }
        let Some(key) = &self.api_key else {
            return Ok(SearchOutcome::error("Gemini API key not configured"));
        };

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.generate(query, key).await {
                Ok(response) => return Ok(self.outcome(query, response).await),
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = MAX_ATTEMPTS, error = %e, "Search attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Search failed".to_string());
        Ok(SearchOutcome::error(message))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

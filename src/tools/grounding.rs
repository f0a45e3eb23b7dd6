//! Grounding metadata returned by Gemini and the references built from it.
//!
//! Gemini cites its sources through redirect links. Each cited link is
//! followed so the reference carries the real destination URL and the
//! page's `<title>` where one can be read.

use super::envelope::Reference;
use super::build_client;
use super::url::clean_url;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Timeout for each request made while following a link.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on how much of a page body is read to find its title.
const PEEK_BYTES: usize = 8 * 1024;

/// Host of the intermediate page Gemini routes citations through.
const VERTEX_REDIRECT_HOST: &str = "vertexaisearch.cloud.google.com";

/// Page titles served by bot-challenge interstitials instead of content.
const CHALLENGE_TITLES: [&str; 3] = [
    "Attention Required! | Cloudflare",
    "Just a moment...",
    "Security check",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub web_search_queries: Vec<String>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupport>,
}

impl GroundingMetadata {
    pub fn is_empty(&self) -> bool {
        self.web_search_queries.is_empty()
            && self.grounding_chunks.is_empty()
            && self.grounding_supports.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default)]
    pub segment: Segment,
    #[serde(default)]
    pub grounding_chunk_indices: Vec<usize>,
    #[serde(default)]
    pub confidence_scores: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub text: String,
}

/// Where a cited link ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub title: Option<String>,
}

/// Follows citation links to their destination.
#[async_trait]
pub trait ResolveLink: Send + Sync {
    /// Never fails; on error the cleaned input URL is returned without a title.
    async fn resolve(&self, url: &str) -> ResolvedLink;
}

/// Build references from grounding metadata.
///
/// Supports are walked in order and each of their chunk indices is
/// considered in turn. Out-of-range indices, chunks without web data and
/// supports without segment text are skipped. At most `max_references`
/// references are returned.
pub async fn extract_references(
    metadata: &GroundingMetadata,
    resolver: &dyn ResolveLink,
    max_references: usize,
) -> Vec<Reference> {
    let mut references = Vec::new();

    'supports: for support in &metadata.grounding_supports {
        if support.segment.text.is_empty() {
            tracing::debug!("Grounding support has no text, skipping");
            continue;
        }

        for &index in &support.grounding_chunk_indices {
            if references.len() >= max_references {
                break 'supports;
            }

            let Some(chunk) = metadata.grounding_chunks.get(index) else {
                tracing::warn!(index, "Grounding chunk index out of range, skipping");
                continue;
            };
            let Some(web) = &chunk.web else {
                tracing::debug!(index, "Grounding chunk has no web data, skipping");
                continue;
            };

            let resolved = resolver.resolve(&web.uri).await;
            references.push(Reference {
                content: support.segment.text.clone(),
                url: resolved.url,
                title: resolved.title.unwrap_or_else(|| web.title.clone()),
                confidence: support.confidence_scores.first().copied(),
            });
        }
    }

    tracing::debug!(count = references.len(), "Extracted references");
    references
}

/// [`ResolveLink`] over HTTP.
///
/// Issues a HEAD request to follow redirects, then reads the first 8 KiB of
/// the destination to find its title. Pages on the Vertex AI search
/// redirect host are unwrapped through their first `href`.
#[derive(Clone, Debug)]
pub struct LinkResolver {
    client: reqwest::Client,
}

impl LinkResolver {
    pub fn new() -> Result<Self> {
        Self::with_timeout(RESOLVE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = build_client(reqwest::Client::builder().timeout(timeout))?;
        Ok(Self { client })
    }

    async fn follow(&self, url: &str) -> reqwest::Result<ResolvedLink> {
        let head = self.client.head(url).send().await?;
        let mut final_url = head.url().to_string();
        let mut body = self.peek(&final_url).await?;

        if final_url.contains(VERTEX_REDIRECT_HOST) {
            if let Some(target) = first_href(&body) {
                final_url = target;
                body = self.peek(&final_url).await?;
            }
        }

        let title = extract_title(&body).filter(|title| !is_challenge_title(title));
        Ok(ResolvedLink {
            url: final_url,
            title,
        })
    }

    async fn peek(&self, url: &str) -> reqwest::Result<String> {
        let mut response = self.client.get(url).send().await?;
        let mut buf = Vec::with_capacity(PEEK_BYTES);
        while buf.len() < PEEK_BYTES {
            match response.chunk().await? {
                Some(chunk) => buf.extend_from_slice(&chunk),
                None => break,
            }
        }
        buf.truncate(PEEK_BYTES);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl ResolveLink for LinkResolver {
    async fn resolve(&self, url: &str) -> ResolvedLink {
        let url = clean_url(url);
        match self.follow(&url).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to follow reference link");
                ResolvedLink { url, title: None }
            }
        }
    }
}

/// Text of the first `<title>` element, trimmed.
pub fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let len = lower[start..].find('<')?;
    if !lower[start + len..].starts_with("</title") {
        return None;
    }

    let title = html[start..start + len].trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn is_challenge_title(title: &str) -> bool {
    CHALLENGE_TITLES.iter().any(|marker| title.contains(marker))
}

fn first_href(html: &str) -> Option<String> {
    let start = html.find("href=\"")? + "href=\"".len();
    let len = html[start..].find('"')?;
    Some(html[start..start + len].to_string()).filter(|href| !href.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Resolver that answers from a fixed table and records what it was asked.
    #[derive(Default)]
    struct TableResolver {
        titles: HashMap<String, ResolvedLink>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResolveLink for TableResolver {
        async fn resolve(&self, url: &str) -> ResolvedLink {
            self.calls.lock().unwrap().push(url.to_string());
            self.titles.get(url).cloned().unwrap_or(ResolvedLink {
                url: url.to_string(),
                title: None,
            })
        }
    }

    fn metadata() -> GroundingMetadata {
        serde_json::from_value(serde_json::json!({
            "webSearchQueries": ["rust async"],
            "groundingChunks": [
                {"web": {"uri": "https://redirect/1", "title": "one.example"}},
                {"retrievedContext": {}},
                {"web": {"uri": "https://redirect/2", "title": "two.example"}}
            ],
            "groundingSupports": [
                {
                    "segment": {"text": "First claim."},
                    "groundingChunkIndices": [0, 1, 7],
                    "confidenceScores": [0.9, 0.4]
                },
                {
                    "segment": {"text": ""},
                    "groundingChunkIndices": [2]
                },
                {
                    "segment": {"text": "Second claim."},
                    "groundingChunkIndices": [2, 0]
                }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_extract_references_skips_unusable_chunks() {
        let mut resolver = TableResolver::default();
        resolver.titles.insert(
            "https://redirect/1".into(),
            ResolvedLink {
                url: "https://one.example/post".into(),
                title: Some("One Post".into()),
            },
        );

        let references = extract_references(&metadata(), &resolver, 10).await;

        assert_eq!(references.len(), 3);
        assert_eq!(references[0].content, "First claim.");
        assert_eq!(references[0].url, "https://one.example/post");
        assert_eq!(references[0].title, "One Post");
        assert_eq!(references[0].confidence, Some(0.9));

        // Falls back to the chunk title when the page had none
        assert_eq!(references[1].content, "Second claim.");
        assert_eq!(references[1].url, "https://redirect/2");
        assert_eq!(references[1].title, "two.example");
        assert_eq!(references[1].confidence, None);

        // Supports without text never trigger a lookup
        let calls = resolver.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn test_extract_references_stops_at_limit() {
        let resolver = TableResolver::default();
        let references = extract_references(&metadata(), &resolver, 1).await;
        assert_eq!(references.len(), 1);
        assert_eq!(resolver.calls.lock().unwrap().len(), 1);

        let none = extract_references(&metadata(), &resolver, 0).await;
        assert!(none.is_empty());
    }

    #[test]
    fn test_empty_metadata() {
        let metadata: GroundingMetadata = serde_json::from_str("{}").unwrap();
        assert!(metadata.is_empty());
        assert!(!self::metadata().is_empty());
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("<html><head><TITLE lang=\"en\"> Rust Book </TITLE></head>"),
            Some("Rust Book".to_string())
        );
        assert_eq!(extract_title("<title></title>"), None);
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_challenge_titles() {
        assert!(is_challenge_title("Just a moment..."));
        assert!(is_challenge_title("Attention Required! | Cloudflare"));
        assert!(!is_challenge_title("The Rust Programming Language"));
    }

    #[test]
    fn test_first_href() {
        let page = r#"<a class="x" href="https://docs.rs/tokio">continue</a><a href="/other">"#;
        assert_eq!(first_href(page), Some("https://docs.rs/tokio".to_string()));
        assert_eq!(first_href("<p>nothing</p>"), None);
    }
}

//! Stub tool adapters for exercising the admission flow
//!
//! Each stub counts its invocations so tests can assert that a rejected
//! request never reached the tool.

use crate::tools::{ScrapeOutcome, ScrapeTool, SearchData, SearchOutcome, SearchTool};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How a stub tool answers
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Success envelope
    Succeed,
    /// Error envelope carrying the message (maps to 400)
    Fail(String),
    /// `Err` from the adapter (maps to 500)
    Error(String),
    /// Panic inside the adapter
    Panic(String),
}

#[derive(Debug)]
struct Counter {
    behavior: StubBehavior,
    calls: AtomicUsize,
}

impl Counter {
    fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Count the call and return the behavior to act on.
    fn hit(&self) -> &StubBehavior {
        self.calls.fetch_add(1, Ordering::SeqCst);
        &self.behavior
    }
}

/// [`SearchTool`] answering from a fixed [`StubBehavior`]
#[derive(Debug)]
pub struct StubSearch(Counter);

impl StubSearch {
    pub fn new(behavior: StubBehavior) -> Self {
        Self(Counter::new(behavior))
    }

    pub fn succeeding() -> Self {
        Self::new(StubBehavior::Succeed)
    }

    /// Number of times `search` has run
    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchTool for StubSearch {
    async fn search(&self, query: &str) -> anyhow::Result<SearchOutcome> {
        match self.0.hit() {
            StubBehavior::Succeed => Ok(SearchOutcome::success(SearchData {
                prompt: query.to_string(),
                search_query: vec![query.to_string()],
                response: format!("Results for {}", query),
                references: Vec::new(),
            })),
            StubBehavior::Fail(message) => Ok(SearchOutcome::error(message.clone())),
            StubBehavior::Error(message) => Err(anyhow::anyhow!("{}", message)),
            StubBehavior::Panic(message) => panic!("{}", message),
        }
    }
}

/// [`ScrapeTool`] answering from a fixed [`StubBehavior`]
#[derive(Debug)]
pub struct StubScraper(Counter);

impl StubScraper {
    pub fn new(behavior: StubBehavior) -> Self {
        Self(Counter::new(behavior))
    }

    pub fn succeeding() -> Self {
        Self::new(StubBehavior::Succeed)
    }

    /// Number of times `scrape` has run
    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScrapeTool for StubScraper {
    async fn scrape(&self, url: &str, render_js: bool) -> anyhow::Result<ScrapeOutcome> {
        match self.0.hit() {
            StubBehavior::Succeed => Ok(ScrapeOutcome::success(format!(
                "# {}\n\nrendered: {}",
                url, render_js
            ))),
            StubBehavior::Fail(message) => Ok(ScrapeOutcome::error(message.clone())),
            StubBehavior::Error(message) => Err(anyhow::anyhow!("{}", message)),
            StubBehavior::Panic(message) => panic!("{}", message),
        }
    }
}

//! Result envelopes returned by the tools.
//!
//! Tools report logical failures in-band as `{"status": "error", "error": ...}`;
//! the HTTP layer turns those into 400 responses via [`Envelope::into_success`].

use crate::error::{Result, ToolgateError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Common view over tool envelopes.
pub trait Envelope: Sized {
    fn status(&self) -> Status;
    fn error_message(&self) -> Option<&str>;

    /// Pass a success envelope through; turn an error envelope into
    /// [`ToolgateError::ToolFailure`] carrying the tool's message.
    fn into_success(self) -> Result<Self> {
        match self.status() {
            Status::Success => Ok(self),
            Status::Error => Err(ToolgateError::tool_failure(
                self.error_message().unwrap_or("Tool reported an error"),
            )),
        }
    }
}

/// One grounding source backing part of a search answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub content: String,
    pub url: String,
    pub title: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchData {
    pub prompt: String,
    pub search_query: Vec<String>,
    pub response: String,
    pub references: Vec<Reference>,
}

/// Envelope returned by `/search_web`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SearchData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn success(data: SearchData) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl Envelope for SearchOutcome {
    fn status(&self) -> Status {
        self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Envelope returned by `/scrape_url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            content: None,
            error: Some(message.into()),
        }
    }
}

impl Envelope for ScrapeOutcome {
    fn status(&self) -> Status {
        self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

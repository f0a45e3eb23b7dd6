use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;

/// The main error type for toolgate
///
/// Every failure that reaches the HTTP boundary is one of these variants and
/// is rendered as a `{"detail": ...}` body with the matching status code.
#[derive(Debug, thiserror::Error)]
pub enum ToolgateError {
    /// Missing or wrong `X-API-Key` header
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The tool's sliding window is full
    #[error("Rate limit exceeded for {tool}. Please try again later.")]
    RateLimited { tool: String, retry_after: Duration },

    /// A tool adapter reported a logical failure in its own envelope
    #[error("{0}")]
    ToolFailure(String),

    #[error("{0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Error body shared by every non-success response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ToolgateError {
    pub fn rate_limited(tool: impl Into<String>, retry_after: Duration) -> Self {
        Self::RateLimited {
            tool: tool.into(),
            retry_after,
        }
    }

    pub fn tool_failure(msg: impl Into<String>) -> Self {
        Self::ToolFailure(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidApiKey => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ToolFailure(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Config(_) | Self::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whole seconds for the `Retry-After` header, rounded up and never
    /// less than one.
    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ToolgateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %detail, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %detail, "Request rejected");
        }

        let retry_after = self.retry_after_secs();
        let mut response = (status, Json(ErrorResponse { detail })).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for toolgate handlers
pub type Result<T> = std::result::Result<T, ToolgateError>;

//! Per-route rate limiting.
//!
//! Each tool route gets its own [`ToolRateLimitLayer`] naming the tool and
//! its limits. The layer attaches a [`ToolQuota`] to every request it sees;
//! the handler extracts it and calls [`ToolQuota::admit`] once its body
//! extractors have succeeded, so requests axum rejects as malformed never
//! touch the limiter. Admission fetches (or lazily creates) the tool's
//! limiter from the shared [`LimiterRegistry`] and rejects with 429 when the
//! window is full. It never waits for a slot.

use super::{
    config::RateLimitConfig,
    registry::LimiterRegistry,
    window::Admission,
};
use crate::error::ToolgateError;
use axum::{extract::FromRequestParts, extract::Request, http::request::Parts};
use governor::clock::{Clock, DefaultClock};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

/// One tool's share of the registry, carried in request extensions.
pub struct ToolQuota<C: Clock = DefaultClock> {
    registry: Arc<LimiterRegistry<C>>,
    tool: Arc<str>,
    limit: RateLimitConfig,
}

impl<C: Clock> Clone for ToolQuota<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            tool: self.tool.clone(),
            limit: self.limit,
        }
    }
}

impl<C: Clock + Clone> ToolQuota<C> {
    pub fn new(
        registry: Arc<LimiterRegistry<C>>,
        tool: impl Into<Arc<str>>,
        limit: RateLimitConfig,
    ) -> Self {
        Self {
            registry,
            tool: tool.into(),
            limit,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn limit(&self) -> RateLimitConfig {
        self.limit
    }

    /// Record one request against the tool's window, or reject it.
    pub fn admit(&self) -> Result<(), ToolgateError> {
        let limiter = self.registry.get_or_create(
            &self.tool,
            self.limit.max_requests,
            self.limit.time_window_seconds,
        );

        match limiter.check() {
            Admission::Admitted => Ok(()),
            Admission::Rejected { retry_after } => {
                tracing::warn!(
                    target: "toolgate.ratelimit.rejected",
                    tool = %self.tool,
                    max_requests = self.limit.max_requests,
                    window_secs = self.limit.time_window_seconds,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Tool rate limit exceeded"
                );
                Err(ToolgateError::rate_limited(self.tool.as_ref(), retry_after))
            }
        }
    }
}

impl<S, C> FromRequestParts<S> for ToolQuota<C>
where
    S: Send + Sync,
    C: Clock + Clone + Send + Sync + 'static,
{
    type Rejection = ToolgateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ToolQuota<C>>()
            .cloned()
            .ok_or_else(|| ToolgateError::internal("Route has no rate limit layer"))
    }
}

/// Tower layer binding one tool's limits to a route
pub struct ToolRateLimitLayer<C: Clock = DefaultClock> {
    quota: ToolQuota<C>,
}

impl<C: Clock + Clone> ToolRateLimitLayer<C> {
    pub fn new(
        registry: Arc<LimiterRegistry<C>>,
        tool: impl Into<Arc<str>>,
        limit: RateLimitConfig,
    ) -> Self {
        Self {
            quota: ToolQuota::new(registry, tool, limit),
        }
    }

    pub fn tool(&self) -> &str {
        self.quota.tool()
    }
}

impl<C: Clock> Clone for ToolRateLimitLayer<C> {
    fn clone(&self) -> Self {
        Self {
            quota: self.quota.clone(),
        }
    }
}

impl<S, C: Clock> Layer<S> for ToolRateLimitLayer<C> {
    type Service = ToolRateLimitService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        ToolRateLimitService {
            inner,
            quota: self.quota.clone(),
        }
    }
}

/// Tower service attaching a [`ToolQuota`] to each request
pub struct ToolRateLimitService<S, C: Clock = DefaultClock> {
    inner: S,
    quota: ToolQuota<C>,
}

impl<S: Clone, C: Clock> Clone for ToolRateLimitService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            quota: self.quota.clone(),
        }
    }
}

impl<S, C> Service<Request> for ToolRateLimitService<S, C>
where
    S: Service<Request>,
    C: Clock + Clone + Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        req.extensions_mut().insert(self.quota.clone());
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, response::Response, routing::post};
    use governor::clock::FakeRelativeClock;
    use std::time::Duration;
    use tower::ServiceExt;

    type FakeQuota = ToolQuota<FakeRelativeClock>;

    async fn limited(quota: FakeQuota) -> Result<&'static str, ToolgateError> {
        quota.admit()?;
        Ok("ok")
    }

    async fn limited_json(
        quota: FakeQuota,
        Json(_body): Json<serde_json::Value>,
    ) -> Result<&'static str, ToolgateError> {
        quota.admit()?;
        Ok("ok")
    }

    fn limited_router(registry: Arc<LimiterRegistry<FakeRelativeClock>>, max: u32, window: u64) -> Router {
        Router::new()
            .route("/search_web", post(limited))
            .route("/search_json", post(limited_json))
            .route_layer(ToolRateLimitLayer::new(
                registry,
                "web_search",
                RateLimitConfig::new(max, window),
            ))
    }

    async fn call(router: &Router) -> Response {
        call_with(router, "/search_web", "").await
    }

    async fn call_with(router: &Router, uri: &str, body: &'static str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body))
            .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_rejects_once_window_is_full() {
        let registry = Arc::new(LimiterRegistry::with_clock(FakeRelativeClock::default()));
        let router = limited_router(registry, 2, 60);

        assert_eq!(call(&router).await.status(), StatusCode::OK);
        assert_eq!(call(&router).await.status(), StatusCode::OK);

        let rejected = call(&router).await;
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        // A request exactly one window old still counts, so the wait is just over 60s
        assert_eq!(rejected.headers()["retry-after"], "61");
    }

    #[tokio::test]
    async fn test_admits_again_after_window_passes() {
        let clock = FakeRelativeClock::default();
        let registry = Arc::new(LimiterRegistry::with_clock(clock.clone()));
        let router = limited_router(registry, 1, 5);

        assert_eq!(call(&router).await.status(), StatusCode::OK);
        clock.advance(Duration::from_secs(5));
        assert_eq!(call(&router).await.status(), StatusCode::TOO_MANY_REQUESTS);
        clock.advance(Duration::from_millis(1));
        assert_eq!(call(&router).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_waiting_retry_after_is_enough() {
        let clock = FakeRelativeClock::default();
        let registry = Arc::new(LimiterRegistry::with_clock(clock.clone()));
        let router = limited_router(registry, 1, 5);

        assert_eq!(call(&router).await.status(), StatusCode::OK);
        clock.advance(Duration::from_millis(2500));

        let rejected = call(&router).await;
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejected.headers()["retry-after"], "3");

        clock.advance(Duration::from_secs(3));
        assert_eq!(call(&router).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_limiter_created_lazily_in_registry() {
        let registry = Arc::new(LimiterRegistry::with_clock(FakeRelativeClock::default()));
        let router = limited_router(registry.clone(), 3, 30);
        assert!(registry.is_empty());

        call(&router).await;

        let limiter = registry.get("web_search").expect("limiter should exist");
        assert_eq!(limiter.max_requests(), 3);
        assert_eq!(limiter.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_rejected_body_leaves_quota_intact() {
        let registry = Arc::new(LimiterRegistry::with_clock(FakeRelativeClock::default()));
        let router = limited_router(registry.clone(), 1, 60);

        let malformed = call_with(&router, "/search_json", "{").await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert!(registry.get("web_search").is_none());

        let valid = call_with(&router, "/search_json", "{}").await;
        assert_eq!(valid.status(), StatusCode::OK);
        assert_eq!(call(&router).await.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unmatched_routes_are_not_counted() {
        let registry = Arc::new(LimiterRegistry::with_clock(FakeRelativeClock::default()));
        let router = limited_router(registry.clone(), 1, 60);

        let request = Request::builder()
            .uri("/missing")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(registry.get("web_search").is_none());
    }

    #[tokio::test]
    async fn test_quota_without_layer_is_internal_error() {
        let router: Router = Router::new().route("/search_web", post(limited));
        assert_eq!(
            call(&router).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

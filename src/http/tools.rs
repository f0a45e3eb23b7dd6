//! Tool endpoints and their per-route rate limits.

use crate::app::AppContext;
use crate::error::Result;
use crate::http::RouteModule;
use crate::ratelimit::{LimiterRegistry, RateLimitConfig, ToolQuota, ToolRateLimitLayer};
use crate::tools::{Envelope, ScrapeOutcome, SearchOutcome, ToolsConfig, URL_SCRAPER, WEB_SEARCH};
use axum::{
    Json, Router,
    extract::State,
    routing::{MethodRouter, post},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub render_js: bool,
}

/// One rate-limited tool endpoint.
#[derive(Clone)]
pub struct ToolRoute {
    pub tool: &'static str,
    pub path: &'static str,
    pub rate_limit: RateLimitConfig,
    handler: MethodRouter<AppContext>,
}

impl std::fmt::Debug for ToolRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRoute")
            .field("tool", &self.tool)
            .field("path", &self.path)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// `POST /search_web` and `POST /scrape_url`, each behind its tool's limiter.
///
/// Limiters are looked up in the shared registry by tool name, so every
/// route naming the same tool shares one quota. Handlers admit the request
/// only after its JSON body has been extracted.
#[derive(Debug, Clone)]
pub struct ToolRoutes {
    registry: Arc<LimiterRegistry>,
    table: Vec<ToolRoute>,
}

impl ToolRoutes {
    pub fn new(registry: Arc<LimiterRegistry>, tools: &ToolsConfig) -> Self {
        let table = vec![
            ToolRoute {
                tool: WEB_SEARCH,
                path: "/search_web",
                rate_limit: tools.web_search.rate_limit,
                handler: post(search_web),
            },
            ToolRoute {
                tool: URL_SCRAPER,
                path: "/scrape_url",
                rate_limit: tools.url_scraper.rate_limit,
                handler: post(scrape_url),
            },
        ];
        Self { registry, table }
    }

    pub fn table(&self) -> &[ToolRoute] {
        &self.table
    }
}

impl RouteModule for ToolRoutes {
    fn routes(&self) -> Router<AppContext> {
        self.table.iter().fold(Router::new(), |router, route| {
            let limit = ToolRateLimitLayer::new(self.registry.clone(), route.tool, route.rate_limit);
            router.route(route.path, route.handler.clone().route_layer(limit))
        })
    }
}

async fn search_web(
    State(ctx): State<AppContext>,
    quota: ToolQuota,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchOutcome>> {
    quota.admit()?;
    let outcome = ctx.search()?.search(&request.query).await?;
    Ok(Json(outcome.into_success()?))
}

async fn scrape_url(
    State(ctx): State<AppContext>,
    quota: ToolQuota,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<ScrapeOutcome>> {
    quota.admit()?;
    let outcome = ctx
        .scraper()?
        .scrape(&request.url, request.render_js)
        .await?;
    Ok(Json(outcome.into_success()?))
}

//! End-to-end admission flow: API key, then tool rate limit, then the tool.

use serde_json::json;
use std::sync::Arc;
use toolgate::testing::{self, StubBehavior, StubScraper, StubSearch};
use toolgate::tools::ToolsConfig;
use toolgate::{AppContext, RateLimitConfig};

const KEY: &str = "test-secret";

fn tools(search: RateLimitConfig, scrape: RateLimitConfig) -> ToolsConfig {
    let mut tools = ToolsConfig::default();
    tools.web_search.rate_limit = search;
    tools.url_scraper.rate_limit = scrape;
    tools
}

fn context(search: &Arc<StubSearch>, scraper: &Arc<StubScraper>) -> AppContext {
    AppContext::builder()
        .with_search(search.clone())
        .with_scraper(scraper.clone())
        .build()
}

#[tokio::test]
async fn test_missing_key_is_forbidden_and_tool_not_invoked() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::succeeding());
    let app = testing::tool_router(KEY, ToolsConfig::default(), context(&search, &scraper));

    testing::post(app.clone(), "/search_web")
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_forbidden()
        .assert_detail("Invalid API key")
        .await;

    testing::post(app, "/scrape_url")
        .with_api_key("wrong-secret")
        .json_body(&json!({"url": "https://example.com"}))
        .execute()
        .await
        .assert_forbidden()
        .assert_detail("Invalid API key")
        .await;

    assert_eq!(search.calls(), 0);
    assert_eq!(scraper.calls(), 0);
}

#[tokio::test]
async fn test_forbidden_requests_do_not_consume_quota() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::succeeding());
    let context = context(&search, &scraper);
    let registry = context.registry.clone();
    let app = testing::tool_router(
        KEY,
        tools(RateLimitConfig::new(1, 60), RateLimitConfig::default()),
        context,
    );

    for _ in 0..3 {
        testing::post(app.clone(), "/search_web")
            .json_body(&json!({"query": "rust"}))
            .execute()
            .await
            .assert_forbidden();
    }
    assert!(registry.get("web_search").is_none());

    testing::post(app, "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_second_call_in_window_is_rate_limited() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::succeeding());
    let app = testing::tool_router(
        KEY,
        tools(RateLimitConfig::new(1, 60), RateLimitConfig::default()),
        context(&search, &scraper),
    );

    testing::post(app.clone(), "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_ok()
        .assert_json_path("status", json!("success"))
        .await
        .assert_json_path("data.prompt", json!("rust"))
        .await;

    testing::post(app, "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_too_many_requests()
        .assert_has_header("retry-after")
        .assert_detail("Rate limit exceeded for web_search. Please try again later.")
        .await;

    assert_eq!(search.calls(), 1);
}

#[tokio::test]
async fn test_tools_have_separate_quotas() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::succeeding());
    let app = testing::tool_router(
        KEY,
        tools(RateLimitConfig::new(1, 60), RateLimitConfig::new(1, 60)),
        context(&search, &scraper),
    );

    testing::post(app.clone(), "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_ok();

    // The search quota is spent; scraping still has its own
    testing::post(app.clone(), "/scrape_url")
        .with_api_key(KEY)
        .json_body(&json!({"url": "https://example.com", "render_js": true}))
        .execute()
        .await
        .assert_ok()
        .assert_json_path("content", json!("# https://example.com\n\nrendered: true"))
        .await;

    testing::post(app, "/scrape_url")
        .with_api_key(KEY)
        .json_body(&json!({"url": "https://example.com"}))
        .execute()
        .await
        .assert_too_many_requests()
        .assert_detail("Rate limit exceeded for url_scraper. Please try again later.")
        .await;

    assert_eq!(search.calls(), 1);
    assert_eq!(scraper.calls(), 1);
}

#[tokio::test]
async fn test_logical_failure_maps_to_400() {
    let search = Arc::new(StubSearch::new(StubBehavior::Fail(
        "No grounding metadata in response".into(),
    )));
    let scraper = Arc::new(StubScraper::new(StubBehavior::Fail("HTTP 404".into())));
    let app = testing::tool_router(KEY, ToolsConfig::default(), context(&search, &scraper));

    testing::post(app.clone(), "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_bad_request()
        .assert_detail("No grounding metadata in response")
        .await;

    testing::post(app, "/scrape_url")
        .with_api_key(KEY)
        .json_body(&json!({"url": "https://example.com/missing"}))
        .execute()
        .await
        .assert_bad_request()
        .assert_detail("HTTP 404")
        .await;
}

#[tokio::test]
async fn test_adapter_error_maps_to_500() {
    let search = Arc::new(StubSearch::new(StubBehavior::Error(
        "connection reset by peer".into(),
    )));
    let scraper = Arc::new(StubScraper::succeeding());
    let app = testing::tool_router(KEY, ToolsConfig::default(), context(&search, &scraper));

    testing::post(app, "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_server_error()
        .assert_detail("connection reset by peer")
        .await;
}

#[tokio::test]
async fn test_adapter_panic_maps_to_500() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::new(StubBehavior::Panic("parser blew up".into())));
    let app = testing::tool_router(KEY, ToolsConfig::default(), context(&search, &scraper));

    testing::post(app.clone(), "/scrape_url")
        .with_api_key(KEY)
        .json_body(&json!({"url": "https://example.com"}))
        .execute()
        .await
        .assert_server_error()
        .assert_detail("parser blew up")
        .await;

    // The server keeps serving after a panic
    testing::post(app, "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "still up"}))
        .execute()
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_unconfigured_tool_is_500() {
    let app = testing::tool_router(KEY, ToolsConfig::default(), AppContext::new());

    testing::post(app, "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_server_error()
        .assert_detail("Search tool not configured")
        .await;
}

#[tokio::test]
async fn test_unknown_route_requires_key() {
    let app = testing::tool_router(KEY, ToolsConfig::default(), AppContext::new());

    testing::get(app.clone(), "/admin")
        .execute()
        .await
        .assert_forbidden()
        .assert_detail("Invalid API key")
        .await;

    testing::get(app, "/admin")
        .with_api_key(KEY)
        .execute()
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_does_not_consume_quota() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::succeeding());
    let app = testing::tool_router(
        KEY,
        tools(RateLimitConfig::new(1, 60), RateLimitConfig::default()),
        context(&search, &scraper),
    );

    let response = testing::post(app.clone(), "/search_web")
        .with_api_key(KEY)
        .raw_json_body("{")
        .execute()
        .await
        .response();
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(search.calls(), 0);

    testing::post(app.clone(), "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_ok();
    assert_eq!(search.calls(), 1);

    testing::post(app, "/search_web")
        .with_api_key(KEY)
        .json_body(&json!({"query": "rust"}))
        .execute()
        .await
        .assert_too_many_requests();
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = testing::tool_router(KEY, ToolsConfig::default(), AppContext::new());

    testing::get(app, "/anything")
        .execute()
        .await
        .assert_forbidden()
        .assert_has_header("x-request-id");
}

#[tokio::test]
async fn test_concurrent_requests_never_exceed_quota() {
    let search = Arc::new(StubSearch::succeeding());
    let scraper = Arc::new(StubScraper::succeeding());
    let app = testing::tool_router(
        KEY,
        tools(RateLimitConfig::new(5, 60), RateLimitConfig::default()),
        context(&search, &scraper),
    );

    let mut handles = Vec::new();
    for i in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            testing::post(app, "/search_web")
                .with_api_key(KEY)
                .json_body(&json!({"query": format!("q{}", i)}))
                .execute()
                .await
                .response()
                .status()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            axum::http::StatusCode::OK => ok += 1,
            axum::http::StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(limited, 15);
    assert_eq!(search.calls(), 5);
}

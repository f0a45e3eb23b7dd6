//! Testing utilities for toolgate
//!
//! - Alba-style HTTP endpoint testing without running a server
//! - Stub tool adapters with call counters
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolgate::{AppContext, testing};
//! use toolgate::testing::StubSearch;
//! use toolgate::tools::ToolsConfig;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn search_succeeds() {
//!     let search = Arc::new(StubSearch::succeeding());
//!     let context = AppContext::builder().with_search(search.clone()).build();
//!     let app = testing::tool_router("secret", ToolsConfig::default(), context);
//!
//!     testing::post(app, "/search_web")
//!         .with_api_key("secret")
//!         .json_body(&json!({"query": "rust"}))
//!         .execute()
//!         .await
//!         .assert_ok();
//!     assert_eq!(search.calls(), 1);
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{StubBehavior, StubScraper, StubSearch};
pub use scenario::{Scenario, ScenarioAssert, get, post};

use crate::{App, AppContext, ConfigBuilder, tools::ToolsConfig};
use axum::Router;

/// Full application router with the tool routes, ready for [`Scenario`]s.
///
/// The router can be cloned per request; clones share the context's limiter
/// registry and tools.
pub fn tool_router(api_key: &str, tools: ToolsConfig, context: AppContext) -> Router {
    let config = ConfigBuilder::new()
        .with_api_key(api_key)
        .with_tools(tools)
        .build()
        .expect("invalid test configuration");

    App::builder()
        .with_config(config)
        .with_context(context)
        .with_tool_routes()
        .build()
        .into_test_router()
}

//! toolgate - an API-key gated HTTP server for agent tools
//!
//! Exposes two tools over HTTP, web search and URL scraping. Every request
//! passes the same admission steps before a tool runs:
//!
//! 1. the `X-API-Key` header must match the configured secret (403 otherwise)
//! 2. the tool's sliding-window rate limit must have room (429 otherwise)
//! 3. the tool adapter runs; its logical failures map to 400, unexpected
//!    errors to 500
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use toolgate::{App, AppContext, ConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     toolgate::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let context = AppContext::from_config(&config)?;
//!
//!     App::builder()
//!         .with_config(config)
//!         .with_context(context)
//!         .with_tool_routes()
//!         .build()
//!         .serve()
//!         .await?;
//!     Ok(())
//! }
//! ```

mod app;
pub mod auth;
mod config;
mod core;
mod error;
mod http;
mod middleware;
pub mod ratelimit;
pub mod testing;
pub mod tools;
pub mod utils;

// Re-exports for public API
pub use app::{AppContext, AppContextBuilder};
pub use config::{AuthConfig, Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use core::{App, AppBuilder};
pub use error::{ErrorResponse, Result, ToolgateError};
pub use http::{RouteModule, ScrapeRequest, SearchRequest, ToolRoute, ToolRoutes};
pub use ratelimit::{LimiterRegistry, RateLimitConfig, RateLimitConfigBuilder, SlidingWindowLimiter};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call early in `main()`, before building the App.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "toolgate=debug")
/// - `TOOLGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from the logging section of a [`Config`]
///
/// `RUST_LOG` still wins when set, so targets like
/// `toolgate.ratelimit.rejected` can be tuned without a config change.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    install_subscriber(env_filter, config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

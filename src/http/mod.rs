//! HTTP routes.
//!
//! Provides the RouteModule trait for organizing routes and the tool
//! endpoints built on it.

pub mod routes;
pub mod tools;

pub use routes::RouteModule;
pub use tools::{ScrapeRequest, SearchRequest, ToolRoute, ToolRoutes};

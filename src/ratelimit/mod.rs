//! Per-tool sliding-window rate limiting.
//!
//! A [`LimiterRegistry`] hands out one [`SlidingWindowLimiter`] per tool
//! name. [`ToolRateLimitLayer`] binds a tool's limits to its route and the
//! handler spends a slot through the extracted [`ToolQuota`].

mod config;
mod layer;
mod registry;
mod window;

pub use config::{RateLimitConfig, RateLimitConfigBuilder};
pub use layer::{ToolQuota, ToolRateLimitLayer, ToolRateLimitService};
pub use registry::LimiterRegistry;
pub use window::{Admission, POLL_INTERVAL, SlidingWindowLimiter};

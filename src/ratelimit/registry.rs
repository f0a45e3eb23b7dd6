use super::window::SlidingWindowLimiter;
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use std::sync::Arc;

/// One sliding-window limiter per tool name.
///
/// Construct a single registry at startup and share it (behind an `Arc`)
/// with every layer that rate limits a tool. The first call to
/// [`get_or_create`](Self::get_or_create) for a name fixes that tool's limits;
/// later calls return the same limiter and ignore their arguments.
pub struct LimiterRegistry<C: Clock = DefaultClock> {
    limiters: DashMap<String, Arc<SlidingWindowLimiter<C>>>,
    clock: C,
}

impl LimiterRegistry<DefaultClock> {
    pub fn new() -> Self {
        Self::with_clock(DefaultClock::default())
    }
}

impl Default for LimiterRegistry<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock + Clone> LimiterRegistry<C> {
    /// Create a registry whose limiters all read time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            limiters: DashMap::new(),
            clock,
        }
    }

    /// Return the limiter for `tool`, creating it on first use.
    ///
    /// Lookup and insertion happen under the same map entry lock, so two
    /// concurrent first calls for a new tool still end up sharing one limiter.
    pub fn get_or_create(
        &self,
        tool: &str,
        max_requests: u32,
        window_seconds: u64,
    ) -> Arc<SlidingWindowLimiter<C>> {
        if let Some(existing) = self.limiters.get(tool) {
            return Self::reuse(tool, existing.value(), max_requests, window_seconds);
        }

        let entry = self.limiters.entry(tool.to_string()).or_insert_with(|| {
            tracing::info!(
                tool,
                max_requests,
                window_secs = window_seconds,
                "Created rate limiter"
            );
            Arc::new(SlidingWindowLimiter::with_clock(
                max_requests,
                window_seconds,
                self.clock.clone(),
            ))
        });
        Self::reuse(tool, entry.value(), max_requests, window_seconds)
    }

    pub fn get(&self, tool: &str) -> Option<Arc<SlidingWindowLimiter<C>>> {
        self.limiters.get(tool).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    fn reuse(
        tool: &str,
        limiter: &Arc<SlidingWindowLimiter<C>>,
        max_requests: u32,
        window_seconds: u64,
    ) -> Arc<SlidingWindowLimiter<C>> {
        if limiter.max_requests() != max_requests || limiter.window().as_secs() != window_seconds {
            tracing::debug!(
                tool,
                requested_max = max_requests,
                requested_window_secs = window_seconds,
                max_requests = limiter.max_requests(),
                window_secs = limiter.window().as_secs(),
                "Ignoring limits for existing rate limiter"
            );
        }
        limiter.clone()
    }
}

impl<C: Clock> std::fmt::Debug for LimiterRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("tools", &self.limiters.len())
            .finish_non_exhaustive()
    }
}

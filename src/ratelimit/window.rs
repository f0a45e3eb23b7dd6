//! Sliding-window limiter for a single tool.
//!
//! Each limiter keeps the instants of the requests it admitted within the
//! trailing window. Entries older than the window are purged lazily on every
//! check, so the deque never holds more than `max_requests` instants.
//!
//! The limiter is generic over governor's [`Clock`] so tests can drive time
//! with a [`FakeRelativeClock`](governor::clock::FakeRelativeClock).

use governor::clock::{Clock, DefaultClock, Reference};
use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

/// Upper bound on how long a waiting caller sleeps between admission attempts.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Rejected; a slot frees up after `retry_after` at the earliest.
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Trailing-window request counter for one tool.
pub struct SlidingWindowLimiter<C: Clock = DefaultClock> {
    max_requests: u32,
    window: Duration,
    clock: C,
    timestamps: Mutex<VecDeque<C::Instant>>,
}

impl SlidingWindowLimiter<DefaultClock> {
    /// Create a limiter allowing `max_requests` per `window_seconds`.
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self::with_clock(max_requests, window_seconds, DefaultClock::default())
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    pub fn with_clock(max_requests: u32, window_seconds: u64, clock: C) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
            clock,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests.min(1024) as usize)),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit the request if the window has room.
    ///
    /// Returns `false` without recording anything when the quota is used up.
    pub fn try_admit(&self) -> bool {
        self.check().is_admitted()
    }

    /// Same decision as [`try_admit`](Self::try_admit), reporting how long
    /// until the oldest counted request leaves the window on rejection.
    ///
    /// A request exactly `window` old still counts against the quota; it is
    /// only purged once it is strictly older than the window.
    pub fn check(&self) -> Admission {
        let now = self.clock.now();
        let mut timestamps = self.lock();
        self.purge(&mut timestamps, now);

        if timestamps.len() < self.max_requests as usize {
            timestamps.push_back(now);
            return Admission::Admitted;
        }

        let retry_after = match timestamps.front() {
            Some(&oldest) => {
                self.window.saturating_sub(elapsed(now, oldest)) + Duration::from_nanos(1)
            }
            // max_requests == 0 never admits
            None => self.window,
        };
        Admission::Rejected { retry_after }
    }

    /// Number of admitted requests still inside the window.
    pub fn in_flight(&self) -> usize {
        let now = self.clock.now();
        let mut timestamps = self.lock();
        self.purge(&mut timestamps, now);
        timestamps.len()
    }

    /// Wait until a slot is admitted.
    ///
    /// Sleeps until the oldest request should have left the window, but never
    /// longer than [`POLL_INTERVAL`] between attempts. There is no upper bound
    /// on the total wait; wrap the call in `tokio::time::timeout` to bound it.
    pub async fn await_slot(&self) {
        loop {
            match self.check() {
                Admission::Admitted => return,
                Admission::Rejected { retry_after } => {
                    tokio::time::sleep(retry_after.min(POLL_INTERVAL)).await;
                }
            }
        }
    }

    /// Blocking variant of [`await_slot`](Self::await_slot) for callers
    /// outside an async runtime.
    pub fn block_for_slot(&self) {
        loop {
            match self.check() {
                Admission::Admitted => return,
                Admission::Rejected { retry_after } => {
                    std::thread::sleep(retry_after.min(POLL_INTERVAL));
                }
            }
        }
    }

    fn purge(&self, timestamps: &mut VecDeque<C::Instant>, now: C::Instant) {
        while let Some(&oldest) = timestamps.front() {
            if elapsed(now, oldest) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<C::Instant>> {
        // The deque is never left half-updated.
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock> std::fmt::Debug for SlidingWindowLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

fn elapsed<I: Reference>(now: I, earlier: I) -> Duration {
    now.duration_since(earlier).into()
}

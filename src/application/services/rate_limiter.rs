//! Fixed-window, process-local rate limiter.
//!
//! One counter per key (client address + method + path). A counter is
//! (re)initialized on the first request for its key or on the first request
//! after its window lapsed; there is no sliding and no carry-over, so bursts
//! at window boundaries are possible.
//!
//! Counters for idle keys are not dropped by `check`; call
//! [`RateLimiter::purge_expired`] periodically to bound memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::entities::RateLimitRule;

/// Source of the current time, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter map guarded by a single mutex.
///
/// The lock is never held across an `.await`.
pub struct RateLimiter {
    counters: Mutex<HashMap<String, WindowCounter>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Builds the counter key for a request.
    pub fn key(client: &str, method: &str, path: &str) -> String {
        format!("{client}:{method}:{path}")
    }

    /// Counts one request for `key` and reports whether the budget is exceeded.
    ///
    /// - First request for a key, or first after `reset_at` has passed:
    ///   counter becomes 1, window restarts, returns `false`.
    /// - Otherwise: counter is incremented, returns `count > max_requests`.
    pub fn check(&self, key: &str, max_requests: u32, window_seconds: u64) -> bool {
        let now = self.clock.now();
        let mut counters = self.lock();

        match counters.get_mut(key) {
            Some(counter) if now <= counter.reset_at => {
                counter.count = counter.count.saturating_add(1);
                counter.count > max_requests
            }
            _ => {
                counters.insert(
                    key.to_string(),
                    WindowCounter {
                        count: 1,
                        reset_at: window_end(now, window_seconds),
                    },
                );
                false
            }
        }
    }

    /// [`check`](Self::check) with the budget taken from a rule.
    pub fn check_rule(&self, key: &str, rule: RateLimitRule) -> bool {
        self.check(key, rule.max_requests, rule.window_seconds)
    }

    /// Drops counters whose window has lapsed and returns how many were removed.
    ///
    /// Equivalent to letting the next `check` reinitialize them.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut counters = self.lock();
        let before = counters.len();
        counters.retain(|_, counter| now <= counter.reset_at);
        before - counters.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WindowCounter>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// End of a window starting at `now`, clamped to [`RateLimitRule::MAX_WINDOW_SECONDS`].
fn window_end(now: Instant, window_seconds: u64) -> Instant {
    let window = Duration::from_secs(window_seconds.min(RateLimitRule::MAX_WINDOW_SECONDS));
    now.checked_add(window).unwrap_or(now)
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

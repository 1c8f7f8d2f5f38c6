//! Fixed window rate limiting, kept in memory.
//!
//! Each key gets `max_requests` per window. The window starts with the first request made by a
//! key and the count resets once it's over. Windows live in a bounded cache and expire on their
//! own, so the limiter never holds more than its capacity in keys.
use log::debug;
use moka::sync::Cache;
use moka::Expiry;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: u64 = 10_000;

pub struct RateLimiter {
    windows: Cache<Arc<str>, Arc<Window>>,
}

struct Window {
    length: Duration,
    counter: Mutex<Counter>,
}

struct Counter {
    started: Instant,
    count: u32,
}

/// A window is dropped from the cache once it's over.
struct WindowExpiry;

impl Expiry<Arc<str>, Arc<Window>> for WindowExpiry {
    fn expire_after_create(
        &self,
        _key: &Arc<str>,
        window: &Arc<Window>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(window.length)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most `capacity` keys are tracked at once.
    pub fn with_capacity(capacity: u64) -> Self {
        let windows = Cache::builder()
            .max_capacity(capacity)
            .expire_after(WindowExpiry)
            .build();

        RateLimiter { windows }
    }

    /// Counts a request for `key`, and returns false if it goes over `max_requests` for the
    /// current window.
    pub fn check(&self, key: &str, max_requests: u32, window: Duration) -> bool {
        self.check_at(key, max_requests, window, Instant::now())
    }

    fn check_at(&self, key: &str, max_requests: u32, window: Duration, now: Instant) -> bool {
        let tracked = self.windows.get_with(Arc::from(key), || {
            Arc::new(Window {
                length: window,
                counter: Mutex::new(Counter {
                    started: now,
                    count: 0,
                }),
            })
        });

        // Poisoned locks are recovered, the counts stay usable.
        let mut counter = tracked
            .counter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(counter.started) >= tracked.length {
            *counter = Counter {
                started: now,
                count: 0,
            };
        }

        if counter.count >= max_requests {
            debug!("rate limited {key}: {} requests in the current window", counter.count);
            return false;
        }

        counter.count += 1;

        true
    }

    /// How many keys are currently tracked.
    pub fn tracked_keys(&self) -> u64 {
        self.windows.run_pending_tasks();
        self.windows.entry_count()
    }
}

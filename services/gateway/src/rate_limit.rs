//! Per-user write throttling
//!
//! All mutating endpoints draw from one budget per user: at most
//! [`RateLimiter::WRITE_LIMIT`] writes within any
//! [`RateLimiter::WRITE_WINDOW`]. Budgets are fixed windows that restart
//! lazily on the first request after expiry, so an idle user's entry
//! costs nothing until they write again.

use crate::error::ApiError;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    // Keyed by user id; every write endpoint shares the user's budget.
    windows: DashMap<String, Window>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Writes allowed per user per window.
    pub const WRITE_LIMIT: u32 = 60;
    /// Budget window for mutating endpoints.
    pub const WRITE_WINDOW: Duration = Duration::from_secs(60);

    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Count one request against `key`, allowing at most `limit` per
    /// `window`.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> Result<(), ApiError> {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            return Err(ApiError::RateLimited(format!(
                "write budget exhausted for {}",
                key
            )));
        }
        entry.count += 1;
        Ok(())
    }

    /// The shared write budget for one user.
    pub fn check_write(&self, user_id: &str) -> Result<(), ApiError> {
        self.check(user_id, Self::WRITE_LIMIT, Self::WRITE_WINDOW)
    }
}

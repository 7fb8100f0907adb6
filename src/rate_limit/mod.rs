//! Fixed-window rate limiting for the AI endpoints.

mod store;

use std::sync::Arc;
use std::time::Duration;

pub use store::{
    MemoryRateLimitStore, RateLimitError, RateLimitStore, RedisRateLimitStore, WindowHit,
};

use crate::config::Config;

/// Outcome of one `RateLimiter::check` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub is_limited: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in_secs: u64,
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, window: Duration, max_requests: u32) -> Self {
        Self {
            store,
            window,
            max_requests,
        }
    }

    pub fn from_config(store: Arc<dyn RateLimitStore>, config: &Config) -> Self {
        Self::new(store, config.rate_limit_window(), config.rate_limit_requests)
    }

    /// Counts the call against `identifier` and reports whether it is over the limit.
    ///
    /// The counter is incremented even for calls that end up limited. A store
    /// failure admits the request.
    pub async fn check(&self, identifier: &str) -> RateLimitStatus {
        let hit = match self.store.hit(identifier, self.window).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(
                    store = self.store.name(),
                    "Rate limit check failed, admitting request: {}",
                    e
                );
                return RateLimitStatus {
                    is_limited: false,
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_in_secs: self.window.as_secs(),
                };
            }
        };

        let reset_in_secs = ceil_secs(hit.reset_in);
        let max = u64::from(self.max_requests);
        if hit.count > max {
            RateLimitStatus {
                is_limited: true,
                limit: self.max_requests,
                remaining: 0,
                reset_in_secs,
            }
        } else {
            RateLimitStatus {
                is_limited: false,
                limit: self.max_requests,
                remaining: (max - hit.count) as u32,
                reset_in_secs,
            }
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 { secs + 1 } else { secs }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::Client as RedisClient;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    Store(#[from] redis::RedisError),
}

/// Counter state after a hit has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub count: u64,
    pub reset_in: Duration,
}

/// Backing storage for fixed-window counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one hit for `identifier`, opening a new window of length
    /// `window` when none is active.
    async fn hit(&self, identifier: &str, window: Duration) -> Result<WindowHit, RateLimitError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u64,
    window_reset_at: Instant,
}

/// Process-local store. Counters are lost on restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryRateLimitStore {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, identifier: &str, window: Duration) -> Result<WindowHit, RateLimitError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        // Drop every expired window, the caller's included.
        entries.retain(|_, entry| entry.window_reset_at > now);

        let entry = entries
            .entry(identifier.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_reset_at: now + window,
            });
        entry.count += 1;

        Ok(WindowHit {
            count: entry.count,
            reset_in: entry.window_reset_at.saturating_duration_since(now),
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

const REDIS_KEY_PREFIX: &str = "ai-rate-limit:";

/// Shared store for multi-instance deployments. The window lives in the key TTL.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    redis: Arc<RedisClient>,
}

impl RedisRateLimitStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(&self, identifier: &str, window: Duration) -> Result<WindowHit, RateLimitError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", REDIS_KEY_PREFIX, identifier);
        let window_ms = window.as_millis().max(1) as u64;

        // SET NX opens the window only when no counter exists, so INCR never
        // sees a key without an expiry.
        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&key)
            .arg(0)
            .arg("PX")
            .arg(window_ms)
            .arg("NX")
            .ignore()
            .incr(&key, 1)
            .pttl(&key)
            .query_async(&mut conn)
            .await?;

        let reset_in = if ttl_ms > 0 {
            Duration::from_millis(ttl_ms as u64)
        } else {
            window
        };
        Ok(WindowHit { count, reset_in })
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn counts_hits_within_a_window() {
        let store = MemoryRateLimitStore::new();
        assert_eq!(store.hit("1.2.3.4", WINDOW).await.unwrap().count, 1);
        assert_eq!(store.hit("1.2.3.4", WINDOW).await.unwrap().count, 2);
        assert_eq!(store.hit("5.6.7.8", WINDOW).await.unwrap().count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_in_shrinks_as_time_passes() {
        let store = MemoryRateLimitStore::new();
        store.hit("ip", WINDOW).await.unwrap();
        tokio::time::advance(Duration::from_secs(600)).await;
        let hit = store.hit("ip", WINDOW).await.unwrap();
        assert_eq!(hit.reset_in, Duration::from_secs(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_windows_are_purged_on_any_call() {
        let store = MemoryRateLimitStore::new();
        store.hit("a", WINDOW).await.unwrap();
        store.hit("b", WINDOW).await.unwrap();
        assert_eq!(store.tracked(), 2);

        tokio::time::advance(WINDOW).await;
        let hit = store.hit("c", WINDOW).await.unwrap();
        assert_eq!(hit.count, 1);
        assert_eq!(store.tracked(), 1);
    }
}

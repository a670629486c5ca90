//! The slow downstream resource behind the access gate.
//!
//! Responses may be cached per user for a short TTL. The cache only stores
//! the payload; token validity is always decided by the gate first.

use moka::future::Cache;
use std::time::Duration;

/// Cache key namespace for the time resource.
const TIME_RESOURCE: &str = "time";

pub struct ProtectedResource {
    delay: Duration,
    cache: Option<Cache<String, String>>,
}

impl ProtectedResource {
    pub fn new(delay: Duration, cache_ttl: Option<Duration>) -> Self {
        let cache = cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build()
        });
        Self { delay, cache }
    }

    /// Current Unix time as text, computed after the artificial delay.
    pub async fn current_time(&self, username: &str) -> String {
        match &self.cache {
            Some(cache) => {
                let key = format!("{TIME_RESOURCE}:{username}");
                cache.get_with(key, self.compute_time()).await
            }
            None => self.compute_time().await,
        }
    }

    async fn compute_time(&self) -> String {
        tokio::time::sleep(self.delay).await;
        chrono::Utc::now().timestamp().to_string()
    }
}

//! Per-provider minimum-interval gate, shared across every coordinator that
//! talks to the same provider.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Serializes concurrent callers through a minimum spacing interval.
///
/// `wait()` is the only operation: it computes how long has elapsed since
/// the last release, sleeps the remainder of `min_interval` if any, then
/// records the new release time — all under one mutex, so N concurrent
/// callers come out the other side spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_release: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_release: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until at least `min_interval` has passed since the previous
    /// caller's release, then returns.
    pub async fn wait(&self) {
        let mut last = self.last_release.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                trace!(?remaining, "rate limiter sleeping");
                tokio::time::sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Process-wide map from normalized provider name to its shared
/// [`RateLimiter`]. Every [`crate::search_coordinator::SearchCoordinator`]
/// for the same provider is rewired to the same limiter on registration
/// with a [`crate::multi_coordinator::MultiSearchCoordinator`], so
/// concurrent queries against one provider cannot bypass the interval.
#[derive(Default)]
pub struct RateLimiterRegistry {
    limiters: DashMap<String, Arc<RateLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the limiter for `provider`, creating one with `default_interval`
    /// if this is the first time the provider has been seen.
    pub fn get_or_insert(&self, provider: &str, default_interval: Duration) -> Arc<RateLimiter> {
        let key = provider.to_lowercase();
        match self.limiters.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let limiter = Arc::new(RateLimiter::new(default_interval));
                entry.insert(limiter.clone());
                limiter
            }
        }
    }

    pub fn get(&self, provider: &str) -> Option<Arc<RateLimiter>> {
        self.limiters.get(&provider.to_lowercase()).map(|r| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn wait_enforces_minimum_spacing() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(Instant::now().saturating_duration_since(start) >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn registry_shares_one_limiter_per_provider() {
        let registry = RateLimiterRegistry::new();
        let a = registry.get_or_insert("plos", Duration::from_millis(50));
        let b = registry.get_or_insert("PLOS", Duration::from_millis(999));
        assert!(Arc::ptr_eq(&a, &b));
    }
}

use async_trait::async_trait;
use nse_live_premiums::{CacheError, ChainCache, ChainSource, OptionChainSnapshot, UpstreamError};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source that counts calls and can be switched into failure mode.
struct ScriptedSource {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
}

impl ScriptedSource {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainSource for ScriptedSource {
    async fn fetch(&self) -> Result<OptionChainSnapshot, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                excerpt: "<html>Access Denied</html>".to_string(),
            });
        }

        Ok(OptionChainSnapshot::new(json!({
            "filtered": { "data": [{ "strikePrice": 26500, "CE": { "lastPrice": n } }] }
        })))
    }
}

const TTL: Duration = Duration::from_secs(9);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_snapshot_is_reused() {
        let source = ScriptedSource::new();
        let cache = ChainCache::new(source.clone(), TTL);

        let first = cache.get_current().await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        let second = cache.get_current().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_triggers_fetch() {
        let source = ScriptedSource::new();
        let cache = ChainCache::new(source.clone(), TTL);

        let first = cache.get_current().await.unwrap();
        tokio::time::advance(TTL).await;
        let second = cache.get_current().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fallback_on_fetch_failure() {
        let source = ScriptedSource::new();
        let cache = ChainCache::new(source.clone(), TTL);

        let first = cache.get_current().await.unwrap();

        source.set_failing(true);
        tokio::time::advance(Duration::from_secs(30)).await;

        let second = cache.get_current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 2);

        // The failed refresh leaves the old timestamp, so the next call retries
        let third = cache.get_current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failure() {
        let source = ScriptedSource::new();
        let cache = ChainCache::new(source.clone(), TTL);

        let first = cache.get_current().await.unwrap();
        source.set_failing(true);
        tokio::time::advance(TTL).await;
        let _ = cache.get_current().await.unwrap();

        source.set_failing(false);
        let recovered = cache.get_current().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &recovered));
        assert!(cache.age().await.unwrap() < TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_original_age() {
        let source = ScriptedSource::new();
        let cache = ChainCache::new(source.clone(), TTL);

        cache.get_current().await.unwrap();
        source.set_failing(true);
        tokio::time::advance(Duration::from_secs(20)).await;
        cache.get_current().await.unwrap();

        assert!(cache.age().await.unwrap() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_failure_is_no_chain_available() {
        let source = ScriptedSource::new();
        source.set_failing(true);
        let cache = ChainCache::new(source.clone(), TTL);

        let result = cache.get_current().await;
        assert!(matches!(result, Err(CacheError::NoChainAvailable(_))));
        assert_eq!(cache.age().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out() {
        let source = ScriptedSource::with_delay(Duration::from_secs(60));
        let cache = ChainCache::with_fetch_timeout(source.clone(), TTL, Duration::from_secs(10));

        let result = cache.get_current().await;
        assert!(matches!(
            result,
            Err(CacheError::NoChainAvailable(UpstreamError::Timeout(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let source = ScriptedSource::with_delay(Duration::from_secs(1));
        let cache = ChainCache::new(source.clone(), TTL);

        let (a, b) = tokio::join!(cache.get_current(), cache.get_current());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_keeps_cache_warm() {
        let source = ScriptedSource::new();
        let cache = Arc::new(ChainCache::new(source.clone(), TTL));

        let handle = cache.spawn_background_refresh(Duration::from_secs(10));

        // Ticks at 0s, 10s and 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(source.calls(), 3);
        assert!(cache.age().await.is_some());

        // Served from the warm cache without another fetch
        tokio::time::advance(Duration::from_secs(1)).await;
        let _ = cache.get_current().await.unwrap();
        assert_eq!(source.calls(), 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_survives_failures() {
        let source = ScriptedSource::new();
        source.set_failing(true);
        let cache = Arc::new(ChainCache::new(source.clone(), TTL));

        let handle = cache.spawn_background_refresh(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(source.calls(), 2);
        assert!(!handle.is_finished());

        source.set_failing(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), 3);
        assert!(cache.age().await.is_some());

        handle.abort();
    }
}

use crate::config;
use crate::error::{CacheError, UpstreamError};
use crate::models::OptionChainSnapshot;
use crate::nse_client::ChainSource;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

// `fetched_at` is always the time `snapshot` was stored; both are written together.
struct CacheEntry {
    snapshot: Arc<OptionChainSnapshot>,
    fetched_at: Instant,
}

// -----------------------------------------------
// PROCESS-WIDE OPTION CHAIN CACHE
// -----------------------------------------------
pub struct ChainCache {
    source: Arc<dyn ChainSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    entry: RwLock<Option<CacheEntry>>,
    // Serializes refreshes so a burst of requests in one stale window
    // triggers a single upstream fetch.
    refresh_lock: Mutex<()>,
}

impl ChainCache {
    pub fn new(source: Arc<dyn ChainSource>, ttl: Duration) -> Self {
        Self::with_fetch_timeout(source, ttl, config::FETCH_TIMEOUT)
    }

    pub fn with_fetch_timeout(
        source: Arc<dyn ChainSource>,
        ttl: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            entry: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Age of the stored snapshot, `None` while nothing has been fetched.
    pub async fn age(&self) -> Option<Duration> {
        self.entry
            .read()
            .await
            .as_ref()
            .map(|entry| entry.fetched_at.elapsed())
    }

    /// Current chain: cached while younger than the TTL, otherwise refreshed.
    /// A failed refresh falls back to the stale snapshot when one exists.
    pub async fn get_current(&self) -> Result<Arc<OptionChainSnapshot>, CacheError> {
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        let _refreshing = self.refresh_lock.lock().await;

        // Someone else may have refreshed while we waited for the lock
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        let age = self.age().await;
        debug!(
            age_secs = age.map(|age| age.as_secs()),
            "Chain stale or missing, refreshing"
        );

        match self.fetch_bounded().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.entry.write().await = Some(CacheEntry {
                    snapshot: Arc::clone(&snapshot),
                    fetched_at: Instant::now(),
                });
                info!(
                    rows = snapshot.rows().len(),
                    "Fetched chain from NSE at {}",
                    Local::now().format("%H:%M:%S")
                );
                Ok(snapshot)
            }
            Err(err) => match self.entry.read().await.as_ref() {
                Some(stale) => {
                    warn!(
                        error = %err,
                        age_secs = stale.fetched_at.elapsed().as_secs(),
                        "Failed to refresh chain; using stale snapshot"
                    );
                    Ok(Arc::clone(&stale.snapshot))
                }
                None => {
                    error!(error = %err, "Failed to fetch chain and nothing cached");
                    Err(CacheError::NoChainAvailable(err))
                }
            },
        }
    }

    /// Keep the cache warm independent of request traffic. The first tick
    /// fires immediately. Failures are logged and the loop carries on.
    pub fn spawn_background_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = cache.get_current().await {
                    warn!(error = %e, "Background chain refresh failed");
                }
            }
        })
    }

    async fn fresh(&self) -> Option<Arc<OptionChainSnapshot>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    async fn fetch_bounded(&self) -> Result<OptionChainSnapshot, UpstreamError> {
        tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .unwrap_or_else(|_| Err(UpstreamError::Timeout(self.fetch_timeout)))
    }
}

//! Rate caching with TTL support, and the gateway that decides when to use it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use coinrates_common::CurrencySymbol;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::FetchResult;

/// Identifies one cached rate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: String,
    pub base: CurrencySymbol,
    pub target: CurrencySymbol,
}

impl CacheKey {
    pub fn new(provider: impl Into<String>, base: CurrencySymbol, target: CurrencySymbol) -> Self {
        Self {
            provider: provider.into(),
            base,
            target,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.provider.to_lowercase(),
            self.base.as_str().to_lowercase(),
            self.target.as_str().to_lowercase()
        )
    }
}

/// Cached rate entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Decimal,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn new(value: Decimal, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Utc::now(),
            ttl,
        }
    }

    fn is_valid(&self) -> bool {
        Utc::now().signed_duration_since(self.inserted_at) < self.ttl
    }
}

/// Thread-safe rate store with TTL.
pub struct RateCache {
    cache: DashMap<CacheKey, CacheEntry>,
    config: CacheConfig,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Get a rate from cache if valid.
    pub fn get(&self, key: &CacheKey) -> Option<Decimal> {
        if let Some(entry) = self.cache.get(key) {
            if entry.is_valid() {
                debug!(key = %key, "Cache hit");
                return Some(entry.value);
            }
        }

        // Re-checked under the shard lock so a concurrent refresh survives.
        if self.cache.remove_if(key, |_, entry| !entry.is_valid()).is_some() {
            debug!(key = %key, "Cache entry expired");
        }

        debug!(key = %key, "Cache miss");
        None
    }

    /// Insert a rate into cache.
    ///
    /// When the store is full, expired entries are evicted first; if it is
    /// still full a new key is not stored. Existing keys are always updated.
    pub fn insert(&self, key: CacheKey, value: Decimal) {
        if !self.cache.contains_key(&key) && self.cache.len() >= self.config.max_entries {
            self.evict_expired();
            if self.cache.len() >= self.config.max_entries {
                debug!(key = %key, "Cache full, not storing");
                return;
            }
        }

        self.cache.insert(key, CacheEntry::new(value, self.config.ttl()));
    }

    /// Remove a rate from cache.
    pub fn remove(&self, key: &CacheKey) {
        self.cache.remove(key);
    }

    /// Clear all cached rates.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries in cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries.
    pub fn evict_expired(&self) {
        self.cache.retain(|_, entry| entry.is_valid());
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (total, valid) = self.cache.iter().fold((0usize, 0usize), |(total, valid), entry| {
            (total + 1, valid + usize::from(entry.is_valid()))
        });

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total.saturating_sub(valid),
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

/// Shared rate cache.
pub type SharedRateCache = Arc<RateCache>;

/// Get-or-populate access to the rate store, gated per provider.
///
/// Concurrent misses on the same key may both fetch; the last write wins.
#[derive(Clone)]
pub struct CacheGateway {
    store: SharedRateCache,
}

impl CacheGateway {
    pub fn new(store: SharedRateCache) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedRateCache {
        &self.store
    }

    /// Return the cached rate for `key`, or run `fetch` and cache its result.
    ///
    /// With caching disabled the store is neither read nor written. Fetch
    /// errors are returned untouched and never cached.
    pub async fn get_rate<F, Fut>(
        &self,
        key: CacheKey,
        caching_enabled: bool,
        fetch: F,
    ) -> FetchResult<Decimal>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<Decimal>>,
    {
        if !caching_enabled {
            return fetch().await;
        }

        if let Some(value) = self.store.get(&key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.store.insert(key, value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;
    use std::time::Duration as StdDuration;

    fn key(target: &str) -> CacheKey {
        CacheKey::new("coinmarketcapapi", CurrencySymbol::btc(), CurrencySymbol::new(target))
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(key("USD").to_string(), "coinmarketcapapi_btc_usd");
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = RateCache::new();
        cache.insert(key("EUR"), dec!(52000.25));

        assert_eq!(cache.get(&key("EUR")), Some(dec!(52000.25)));
        assert!(cache.get(&key("USD")).is_none());
    }

    #[test]
    fn test_cache_expiry() {
        let config = CacheConfig {
            ttl_secs: 0,
            ..Default::default()
        };
        let cache = RateCache::with_config(config);
        cache.insert(key("EUR"), dec!(1));

        sleep(StdDuration::from_millis(5));

        assert!(cache.get(&key("EUR")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_get_keeps_refreshed_entry() {
        let expired = RateCache::with_config(CacheConfig {
            ttl_secs: 0,
            ..Default::default()
        });
        expired.insert(key("EUR"), dec!(1));
        expired.insert(key("USD"), dec!(2));

        let stats = expired.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 0);
        assert_eq!(stats.expired_entries, 2);

        assert!(expired.get(&key("EUR")).is_none());
        assert_eq!(expired.len(), 1);

        // A live entry under the same key is never dropped by a miss path.
        let cache = RateCache::new();
        cache.insert(key("EUR"), dec!(3));
        assert!(cache.get(&key("USD")).is_none());
        assert_eq!(cache.get(&key("EUR")), Some(dec!(3)));
        assert_eq!(cache.stats().expired_entries, 0);
    }

    #[test]
    fn test_huge_ttl_does_not_panic() {
        let cache = RateCache::with_config(CacheConfig {
            ttl_secs: 100_000_000_000_000_000,
            ..Default::default()
        });
        cache.insert(key("EUR"), dec!(52000.25));

        assert_eq!(cache.get(&key("EUR")), Some(dec!(52000.25)));
        assert_eq!(cache.stats().valid_entries, 1);
    }

    #[test]
    fn test_cache_capacity() {
        let config = CacheConfig {
            max_entries: 2,
            ..Default::default()
        };
        let cache = RateCache::with_config(config);
        cache.insert(key("EUR"), dec!(1));
        cache.insert(key("USD"), dec!(2));
        cache.insert(key("GBP"), dec!(3));
        cache.insert(key("EUR"), dec!(4));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("GBP")).is_none());
        assert_eq!(cache.get(&key("EUR")), Some(dec!(4)));
        assert_eq!(cache.stats().valid_entries, 2);
    }

    #[test]
    fn test_cache_clear() {
        let cache = RateCache::new();
        cache.insert(key("EUR"), dec!(1));
        cache.insert(key("USD"), dec!(2));

        assert_eq!(cache.len(), 2);

        cache.clear();

        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_gateway_disabled_never_touches_store() {
        let gateway = CacheGateway::new(Arc::new(RateCache::new()));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..2 {
            let value = tokio_test::block_on(gateway.get_rate(key("USD"), false, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(dec!(60000))
            }))
            .unwrap();
            assert_eq!(value, dec!(60000));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(gateway.store().get(&key("USD")).is_none());
        assert!(gateway.store().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_enabled_hits_cache() {
        let gateway = CacheGateway::new(Arc::new(RateCache::new()));
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(dec!(55000))
        };

        let first = gateway.get_rate(key("EUR"), true, fetch).await.unwrap();
        let second = gateway.get_rate(key("EUR"), true, fetch).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.store().get(&key("EUR")), Some(dec!(55000)));
    }

    #[tokio::test]
    async fn test_gateway_does_not_cache_failures() {
        let gateway = CacheGateway::new(Arc::new(RateCache::new()));

        let result = gateway
            .get_rate(key("EUR"), true, || async {
                Err(FetchError::Transport {
                    service: "coinmarketcapapi".to_string(),
                    message: "timeout".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
        assert!(gateway.store().is_empty());
    }
}

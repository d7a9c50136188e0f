//! Routing-config caching with TTL and negative entries.
//!
//! Directory lookups sit on every request path, so the configuration
//! provider keeps resolved [`TenantRoutingConfig`] snapshots here:
//!
//! - **TTL-based expiration** with configurable durations
//! - **Capacity eviction** when the cache is full
//! - **Negative caching** to stop repeated lookups of unknown tenants
//! - **Metrics** for monitoring cache performance
//!
//! The cache itself never fetches. Deciding what a miss means (and what
//! may be negative-cached) belongs to the provider.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::TenantRoutingConfig;
use crate::context::TenantId;

/// Configuration for the routing-config cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_entries: usize,
    /// Time-to-live for cached configs.
    pub ttl: Duration,
    /// Time-to-live for negative entries (tenant not found).
    pub negative_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(300),         // 5 minutes
            negative_ttl: Duration::from_secs(60), // 1 minute
        }
    }
}

impl CacheConfig {
    /// Create a new config with the given max entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the negative TTL.
    pub fn with_negative_ttl(mut self, ttl: Duration) -> Self {
        self.negative_ttl = ttl;
        self
    }
}

/// A cached entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached config (None = negative entry).
    config: Option<TenantRoutingConfig>,
    /// When this entry expires.
    expires_at: Instant,
    /// Access count for eviction ordering.
    access_count: u64,
}

impl CacheEntry {
    fn positive(config: TenantRoutingConfig, ttl: Duration) -> Self {
        Self {
            config: Some(config),
            expires_at: Instant::now() + ttl,
            access_count: 1,
        }
    }

    fn negative(ttl: Duration) -> Self {
        Self {
            config: None,
            expires_at: Instant::now() + ttl,
            access_count: 1,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache metrics snapshot.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    /// Total cache hits.
    pub hits: u64,
    /// Total cache misses.
    pub misses: u64,
    /// Negative cache hits.
    pub negative_hits: u64,
    /// Evictions due to capacity.
    pub evictions: u64,
    /// Evictions due to TTL expiration.
    pub expirations: u64,
    /// Current cache size.
    pub size: usize,
}

impl CacheMetrics {
    /// Calculate hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe atomic metrics.
#[derive(Debug, Default)]
pub struct AtomicCacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    negative_hits: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl AtomicCacheMetrics {
    /// Create new atomic metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a negative hit.
    #[inline]
    pub fn record_negative_hit(&self) {
        self.negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a capacity eviction.
    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a TTL expiration.
    #[inline]
    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self, size: usize) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size,
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.negative_hits.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Found a valid config.
    Hit(TenantRoutingConfig),
    /// Found a negative entry (tenant doesn't exist).
    NegativeHit,
    /// Entry not found or expired.
    Miss,
}

/// TTL cache for resolved routing configs.
pub struct ConfigCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    metrics: AtomicCacheMetrics,
}

impl ConfigCache {
    /// Create a new cache with the given config.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.max_entries)),
            config,
            metrics: AtomicCacheMetrics::new(),
        }
    }

    /// Create with default config.
    pub fn default_config() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Get the cache config.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a tenant's config.
    pub fn lookup(&self, tenant_id: &TenantId) -> CacheLookup {
        let entries = self.entries.read();
        match entries.get(tenant_id.as_str()) {
            Some(entry) if entry.is_expired() => {
                self.metrics.record_expiration();
                CacheLookup::Miss
            }
            Some(entry) => match entry.config {
                Some(ref config) => {
                    self.metrics.record_hit();
                    CacheLookup::Hit(config.clone())
                }
                None => {
                    self.metrics.record_negative_hit();
                    CacheLookup::NegativeHit
                }
            },
            None => {
                self.metrics.record_miss();
                CacheLookup::Miss
            }
        }
    }

    /// Insert a resolved config.
    pub fn insert(&self, tenant_id: TenantId, config: TenantRoutingConfig) {
        let key = tenant_id.into_inner();
        let entry = CacheEntry::positive(config, self.config.ttl);

        let mut entries = self.entries.write();
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            self.evict_one(&mut entries);
        }
        entries.insert(key, entry);
    }

    /// Insert a negative entry (tenant not found).
    pub fn insert_negative(&self, tenant_id: TenantId) {
        let key = tenant_id.into_inner();
        let entry = CacheEntry::negative(self.config.negative_ttl);

        let mut entries = self.entries.write();
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            self.evict_one(&mut entries);
        }
        entries.insert(key, entry);
    }

    /// Invalidate one tenant.
    pub fn invalidate(&self, tenant_id: &TenantId) {
        self.entries.write().remove(tenant_id.as_str());
    }

    /// Invalidate all tenants matching a predicate.
    ///
    /// Negative entries are kept; the predicate only sees real configs.
    pub fn invalidate_if<F>(&self, predicate: F)
    where
        F: Fn(&str, &TenantRoutingConfig) -> bool,
    {
        let mut entries = self.entries.write();
        entries.retain(|key, entry| match entry.config {
            Some(ref config) => !predicate(key, config),
            None => true,
        });
    }

    /// Clear the entire cache.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Current cache size.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache metrics.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.snapshot(self.len())
    }

    /// Reset metrics.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Evict all expired entries.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired());

        let evicted = before - entries.len();
        for _ in 0..evicted {
            self.metrics.record_expiration();
        }
        evicted
    }

    /// Evict one entry to make room. Expired entries go first, then the
    /// least-accessed one.
    fn evict_one(&self, entries: &mut HashMap<String, CacheEntry>) {
        let expired_key = entries
            .iter()
            .find(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone());

        if let Some(key) = expired_key {
            entries.remove(&key);
            self.metrics.record_expiration();
            return;
        }

        let coldest_key = entries
            .iter()
            .min_by_key(|(_, entry)| entry.access_count)
            .map(|(key, _)| key.clone());

        if let Some(key) = coldest_key {
            entries.remove(&key);
            self.metrics.record_eviction();
        }
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::IsolationStrategy;

    fn sample_config(tenant_id: &str) -> TenantRoutingConfig {
        TenantRoutingConfig::new(tenant_id, IsolationStrategy::SharedDiscriminator)
    }

    #[test]
    fn test_cache_hit() {
        let cache = ConfigCache::new(CacheConfig::new(100));
        let tenant_id = TenantId::new("corp001");

        cache.insert(tenant_id.clone(), sample_config("corp001"));

        match cache.lookup(&tenant_id) {
            CacheLookup::Hit(config) => assert_eq!(config.tenant_id.as_str(), "corp001"),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_miss() {
        let cache = ConfigCache::new(CacheConfig::new(100));

        match cache.lookup(&TenantId::new("unknown")) {
            CacheLookup::Miss => {}
            other => panic!("expected miss, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_cache() {
        let cache = ConfigCache::new(CacheConfig::new(100));
        let tenant_id = TenantId::new("deleted-tenant");

        cache.insert_negative(tenant_id.clone());

        match cache.lookup(&tenant_id) {
            CacheLookup::NegativeHit => {}
            other => panic!("expected negative hit, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_entry_misses() {
        let cache = ConfigCache::new(CacheConfig::new(100).with_ttl(Duration::ZERO));
        let tenant_id = TenantId::new("corp001");

        cache.insert(tenant_id.clone(), sample_config("corp001"));

        match cache.lookup(&tenant_id) {
            CacheLookup::Miss => {}
            other => panic!("expected miss, got {:?}", other),
        }
        assert_eq!(cache.metrics().expirations, 1);
    }

    #[test]
    fn test_capacity_eviction() {
        let cache = ConfigCache::new(CacheConfig::new(2));

        for i in 0..3 {
            let id = TenantId::new(format!("corp{:03}", i));
            cache.insert(id, sample_config(&format!("corp{:03}", i)));
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn test_invalidate() {
        let cache = ConfigCache::new(CacheConfig::new(100));
        let tenant_id = TenantId::new("corp001");

        cache.insert(tenant_id.clone(), sample_config("corp001"));
        cache.invalidate(&tenant_id);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_if_keeps_negative_entries() {
        let cache = ConfigCache::new(CacheConfig::new(100));
        cache.insert(TenantId::new("corp001"), sample_config("corp001"));
        cache.insert(TenantId::new("corp002"), sample_config("corp002"));
        cache.insert_negative(TenantId::new("ghost"));

        cache.invalidate_if(|key, _| key == "corp001");

        assert_eq!(cache.len(), 2);
        assert!(matches!(
            cache.lookup(&TenantId::new("ghost")),
            CacheLookup::NegativeHit
        ));
    }

    #[test]
    fn test_cache_metrics() {
        let cache = ConfigCache::new(CacheConfig::new(100));
        let tenant_id = TenantId::new("corp001");

        cache.lookup(&tenant_id);
        assert_eq!(cache.metrics().misses, 1);

        cache.insert(tenant_id.clone(), sample_config("corp001"));
        cache.lookup(&tenant_id);

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.size, 1);
        assert!(metrics.hit_rate() > 0.0);

        cache.reset_metrics();
        assert_eq!(cache.metrics().hits, 0);
    }

    #[test]
    fn test_evict_expired() {
        let cache = ConfigCache::new(CacheConfig::new(100).with_ttl(Duration::ZERO));
        cache.insert(TenantId::new("corp001"), sample_config("corp001"));
        cache.insert(TenantId::new("corp002"), sample_config("corp002"));

        assert_eq!(cache.evict_expired(), 2);
        assert!(cache.is_empty());
    }
}

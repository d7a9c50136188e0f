//! Cached access to tenant routing configuration.
//!
//! [`TenantConfigProvider`] is the only component that talks to the
//! [`TenantDirectory`]. Everything else asks the provider, which serves
//! from its [`ConfigCache`] and only falls through to the directory on a
//! miss.
//!
//! Caching policy:
//!
//! - a directory [`TenantError::NotFound`] is authoritative and gets a
//!   negative entry, so unknown tenants cannot hammer the directory
//! - any other directory failure is treated as transient and is never
//!   negative-cached; the next call retries the directory

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheLookup, CacheMetrics, ConfigCache};
use crate::config::TenantRoutingConfig;
use crate::context::TenantId;
use crate::directory::TenantDirectory;
use crate::error::{TenantError, TenantResult};
use crate::strategy::IsolationStrategy;

/// Cached provider of [`TenantRoutingConfig`] snapshots.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use coldchain_tenant::directory::{StaticDirectory, TenantRecord};
/// use coldchain_tenant::provider::TenantConfigProvider;
///
/// # async fn example() -> coldchain_tenant::error::TenantResult<()> {
/// let directory = StaticDirectory::new();
/// directory.insert(TenantRecord::new("corp001", "Polar Fresh Logistics"));
///
/// let provider = TenantConfigProvider::new(Arc::new(directory));
/// let config = provider.get_config(&"corp001".into()).await?;
/// assert_eq!(config.tenant_id.as_str(), "corp001");
/// # Ok(())
/// # }
/// ```
pub struct TenantConfigProvider {
    directory: Arc<dyn TenantDirectory>,
    cache: ConfigCache,
}

impl TenantConfigProvider {
    /// Create a provider with the default cache config.
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self::with_cache_config(directory, CacheConfig::default())
    }

    /// Create a provider with a custom cache config.
    pub fn with_cache_config(directory: Arc<dyn TenantDirectory>, cache: CacheConfig) -> Self {
        Self {
            directory,
            cache: ConfigCache::new(cache),
        }
    }

    /// Get a tenant's routing config, serving from the cache when possible.
    pub async fn get_config(&self, tenant_id: &TenantId) -> TenantResult<TenantRoutingConfig> {
        match self.cache.lookup(tenant_id) {
            CacheLookup::Hit(config) => Ok(config),
            CacheLookup::NegativeHit => {
                debug!(tenant_id = %tenant_id, "tenant negative-cached");
                Err(TenantError::not_found(tenant_id.as_str()))
            }
            CacheLookup::Miss => self.fetch_and_cache(tenant_id).await,
        }
    }

    /// Get a tenant's isolation strategy.
    pub async fn isolation_strategy(&self, tenant_id: &TenantId) -> TenantResult<IsolationStrategy> {
        self.get_config(tenant_id).await.map(|config| config.strategy)
    }

    /// Drop any cached entry and fetch fresh from the directory.
    pub async fn refresh(&self, tenant_id: &TenantId) -> TenantResult<TenantRoutingConfig> {
        self.cache.invalidate(tenant_id);
        self.fetch_and_cache(tenant_id).await
    }

    /// Invalidate one tenant's cached config.
    pub fn invalidate(&self, tenant_id: &TenantId) {
        self.cache.invalidate(tenant_id);
    }

    /// Invalidate every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Cache metrics.
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// The cache behind this provider.
    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    async fn fetch_and_cache(&self, tenant_id: &TenantId) -> TenantResult<TenantRoutingConfig> {
        match self.directory.fetch(tenant_id).await {
            Ok(record) => {
                let config = TenantRoutingConfig::from_record(&record);
                debug!(
                    tenant_id = %tenant_id,
                    strategy = %config.strategy,
                    "tenant config resolved"
                );
                self.cache.insert(tenant_id.clone(), config.clone());
                Ok(config)
            }
            Err(TenantError::NotFound(_)) => {
                debug!(tenant_id = %tenant_id, "tenant not found, caching negative entry");
                self.cache.insert_negative(tenant_id.clone());
                Err(TenantError::not_found(tenant_id.as_str()))
            }
            Err(err) => {
                // Transient directory failures must not poison the cache.
                warn!(tenant_id = %tenant_id, error = %err, "tenant directory fetch failed");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for TenantConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConfigProvider")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryFn, StaticDirectory, TenantRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_directory(
        fetches: Arc<AtomicUsize>,
    ) -> impl TenantDirectory {
        DirectoryFn::new(move |tenant_id: TenantId| {
            let fetches = fetches.clone();
            async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                if tenant_id.as_str() == "corp001" {
                    Ok(TenantRecord::new(tenant_id, "Polar Fresh Logistics"))
                } else {
                    Err(TenantError::not_found(tenant_id.as_str()))
                }
            }
        })
    }

    #[tokio::test]
    async fn test_caches_after_first_fetch() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let provider =
            TenantConfigProvider::new(Arc::new(counting_directory(fetches.clone())));
        let tenant_id = TenantId::new("corp001");

        provider.get_config(&tenant_id).await.unwrap();
        provider.get_config(&tenant_id).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cache_metrics().hits, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_negative_cached() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let provider =
            TenantConfigProvider::new(Arc::new(counting_directory(fetches.clone())));
        let tenant_id = TenantId::new("ghost");

        let first = provider.get_config(&tenant_id).await.unwrap_err();
        let second = provider.get_config(&tenant_id).await.unwrap_err();

        assert!(first.is_not_found());
        assert!(second.is_not_found());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_not_negative_cached() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let fetches_in_directory = fetches.clone();
        let directory = DirectoryFn::new(move |tenant_id: TenantId| {
            let fetches = fetches_in_directory.clone();
            async move {
                if fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TenantError::directory("connection refused"))
                } else {
                    Ok(TenantRecord::new(tenant_id, "Polar Fresh Logistics"))
                }
            }
        });
        let provider = TenantConfigProvider::new(Arc::new(directory));
        let tenant_id = TenantId::new("corp001");

        let first = provider.get_config(&tenant_id).await.unwrap_err();
        assert!(!first.is_not_found());

        let second = provider.get_config(&tenant_id).await.unwrap();
        assert_eq!(second.tenant_id.as_str(), "corp001");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let provider =
            TenantConfigProvider::new(Arc::new(counting_directory(fetches.clone())));
        let tenant_id = TenantId::new("corp001");

        provider.get_config(&tenant_id).await.unwrap();
        provider.invalidate(&tenant_id);
        provider.get_config(&tenant_id).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_every_entry() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let provider =
            TenantConfigProvider::new(Arc::new(counting_directory(fetches.clone())));
        let tenant_id = TenantId::new("corp001");

        provider.get_config(&tenant_id).await.unwrap();
        provider.get_config(&TenantId::new("ghost")).await.unwrap_err();
        provider.invalidate_all();
        provider.get_config(&tenant_id).await.unwrap();
        provider.get_config(&TenantId::new("ghost")).await.unwrap_err();

        assert_eq!(fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let directory = StaticDirectory::new();
        directory.insert(TenantRecord::new("corp001", "Polar Fresh Logistics"));
        let directory = Arc::new(directory);
        let provider = TenantConfigProvider::new(directory.clone());
        let tenant_id = TenantId::new("corp001");

        provider.get_config(&tenant_id).await.unwrap();

        directory.insert(
            TenantRecord::new("corp001", "Polar Fresh Logistics")
                .with_schema("corp001_migrated"),
        );
        let refreshed = provider.refresh(&tenant_id).await.unwrap();
        assert_eq!(refreshed.schema_name(), "corp001_migrated");
    }

    #[tokio::test]
    async fn test_isolation_strategy_shortcut() {
        let directory = StaticDirectory::new();
        directory.insert(TenantRecord::new("corp001", "Polar Fresh Logistics"));
        let provider = TenantConfigProvider::new(Arc::new(directory));

        let strategy = provider
            .isolation_strategy(&TenantId::new("corp001"))
            .await
            .unwrap();
        assert_eq!(strategy, IsolationStrategy::SharedDiscriminator);
    }
}

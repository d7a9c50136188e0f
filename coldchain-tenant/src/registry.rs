//! Routing keys and the pool registry.
//!
//! A [`RoutingKey`] names one physical pool. The shared pool lives under
//! `"default"`; dedicated-database tenants get `"db_<tenant_id>"`. The
//! [`PoolRegistry`] maps keys to pool handles behind an immutable snapshot
//! that writers swap atomically, so the request path never blocks on
//! provisioning.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::TenantId;
use crate::error::{TenantError, TenantResult};
use crate::strategy::IsolationStrategy;

/// Key a pool is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Key of the shared pool.
    pub const DEFAULT: &'static str = "default";

    /// Prefix of dedicated-database keys.
    pub const DEDICATED_PREFIX: &'static str = "db_";

    /// The shared pool's key.
    pub fn shared() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// The dedicated-database key for a tenant.
    pub fn dedicated(tenant_id: &TenantId) -> Self {
        Self(format!("{}{}", Self::DEDICATED_PREFIX, tenant_id))
    }

    /// The key a tenant routes to under a strategy.
    ///
    /// Only dedicated-database tenants get their own key; dedicated-schema
    /// and shared-discriminator tenants ride the shared pool.
    pub fn for_tenant(tenant_id: &TenantId, strategy: IsolationStrategy) -> Self {
        match strategy {
            IsolationStrategy::DedicatedDatabase => Self::dedicated(tenant_id),
            IsolationStrategy::DedicatedSchema | IsolationStrategy::SharedDiscriminator => {
                Self::shared()
            }
        }
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the shared pool's key.
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Whether this is a dedicated-database key.
    pub fn is_dedicated(&self) -> bool {
        self.0.starts_with(Self::DEDICATED_PREFIX)
    }

    /// The tenant a dedicated-database key belongs to.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.0
            .strip_prefix(Self::DEDICATED_PREFIX)
            .map(TenantId::new)
    }
}

impl std::fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutingKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RoutingKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Default for RoutingKey {
    fn default() -> Self {
        Self::shared()
    }
}

/// Registry mapping routing keys to pool handles.
///
/// Reads clone an `Arc` snapshot of the map; writers rebuild the map and
/// swap the snapshot. The default pool is installed at construction and can
/// never be replaced or removed.
///
/// # Example
///
/// ```
/// use coldchain_tenant::registry::{PoolRegistry, RoutingKey};
///
/// let registry = PoolRegistry::new("shared-pool");
/// registry.add_pool(RoutingKey::from("db_corp002"), "corp002-pool").unwrap();
///
/// let pool = registry.resolve(&RoutingKey::from("db_corp002")).unwrap();
/// assert_eq!(pool, "corp002-pool");
/// ```
pub struct PoolRegistry<P> {
    pools: RwLock<Arc<HashMap<RoutingKey, P>>>,
}

impl<P: Clone> PoolRegistry<P> {
    /// Create a registry holding the shared pool under the default key.
    pub fn new(default_pool: P) -> Self {
        let mut pools = HashMap::new();
        pools.insert(RoutingKey::shared(), default_pool);
        Self {
            pools: RwLock::new(Arc::new(pools)),
        }
    }

    /// Register a pool under a key, replacing any previous pool there.
    ///
    /// The default key is rejected: the shared pool is fixed at
    /// construction.
    pub fn add_pool(&self, key: RoutingKey, pool: P) -> TenantResult<()> {
        if key.is_default() {
            return Err(TenantError::registry("the default pool cannot be replaced"));
        }

        let mut guard = self.pools.write();
        let mut pools = HashMap::clone(&guard);
        pools.insert(key.clone(), pool);
        *guard = Arc::new(pools);

        info!(routing_key = %key, "pool registered");
        Ok(())
    }

    /// Remove the pool under a key, returning it for shutdown.
    ///
    /// The default key is rejected.
    pub fn remove_pool(&self, key: &RoutingKey) -> TenantResult<Option<P>> {
        if key.is_default() {
            return Err(TenantError::registry("the default pool cannot be removed"));
        }

        let mut guard = self.pools.write();
        let mut pools = HashMap::clone(&guard);
        let removed = pools.remove(key);
        *guard = Arc::new(pools);

        if removed.is_some() {
            info!(routing_key = %key, "pool deregistered");
        }
        Ok(removed)
    }

    /// Whether a pool is registered under a key.
    pub fn contains(&self, key: &RoutingKey) -> bool {
        self.pools.read().contains_key(key)
    }

    /// Resolve a key to a pool handle.
    ///
    /// A missing dedicated-database key is an error: silently running a
    /// dedicated tenant on the shared pool would mix tenant data. Any other
    /// missing key degrades to the default pool.
    pub fn resolve(&self, key: &RoutingKey) -> TenantResult<P> {
        let snapshot = Arc::clone(&self.pools.read());
        if let Some(pool) = snapshot.get(key) {
            return Ok(pool.clone());
        }

        if key.is_dedicated() {
            let tenant_id = key
                .tenant_id()
                .map(|id| id.into_inner())
                .unwrap_or_default();
            return Err(TenantError::PoolNotProvisioned {
                tenant_id,
                routing_key: key.as_str().to_string(),
            });
        }

        warn!(routing_key = %key, "routing key has no pool, using default");
        match snapshot.get(&RoutingKey::shared()) {
            Some(pool) => Ok(pool.clone()),
            None => Err(TenantError::registry("default pool missing from registry")),
        }
    }

    /// The shared pool.
    pub fn default_pool(&self) -> TenantResult<P> {
        self.resolve(&RoutingKey::shared())
    }

    /// A point-in-time snapshot of the registry.
    pub fn snapshot(&self) -> Arc<HashMap<RoutingKey, P>> {
        Arc::clone(&self.pools.read())
    }

    /// Registered keys, default included.
    pub fn keys(&self) -> Vec<RoutingKey> {
        self.pools.read().keys().cloned().collect()
    }

    /// Number of registered pools, default included.
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Whether the registry holds only unremovable entries.
    ///
    /// Always false: the default pool is installed at construction.
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }
}

impl<P> std::fmt::Debug for PoolRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.pools.read();
        f.debug_struct("PoolRegistry")
            .field("keys", &snapshot.keys().collect::<Vec<_>>())
            .finish()
    }
}

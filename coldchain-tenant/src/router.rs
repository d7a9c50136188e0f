//! Tenant-aware connection routing.
//!
//! [`TenantRouter`] ties the pieces together: it reads the tenant identity
//! from the task scope, resolves the tenant's routing config through the
//! provider, picks the pool out of the registry, and hands back a
//! connection that is already on the right schema.
//!
//! Routing policy:
//!
//! - no identity in scope, or an identity the directory does not know,
//!   degrades to the shared default pool (logged, never an error)
//! - a dedicated-database tenant whose pool is missing is an error; that
//!   tenant's data must never land in shared storage
//! - a failed schema switch is an error and the connection is dropped
//!
//! # Example
//!
//! ```rust,ignore
//! use coldchain_tenant::{router::TenantRouter, scope};
//!
//! let conn = scope::with_tenant("corp001", async {
//!     router.acquire().await
//! })
//! .await?;
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::TenantId;
use crate::error::{TenantError, TenantResult};
use crate::pool::ConnectionPool;
use crate::provider::TenantConfigProvider;
use crate::registry::{PoolRegistry, RoutingKey};
use crate::schema::SchemaSession;
use crate::scope;
use crate::strategy::IsolationStrategy;

/// Routes connection checkouts to the right pool and schema.
pub struct TenantRouter<P> {
    provider: Arc<TenantConfigProvider>,
    registry: Arc<PoolRegistry<P>>,
}

impl<P: ConnectionPool + Clone> TenantRouter<P> {
    /// Create a router over a provider and a pool registry.
    pub fn new(provider: Arc<TenantConfigProvider>, registry: Arc<PoolRegistry<P>>) -> Self {
        Self { provider, registry }
    }

    /// The config provider behind this router.
    pub fn provider(&self) -> &Arc<TenantConfigProvider> {
        &self.provider
    }

    /// The pool registry behind this router.
    pub fn registry(&self) -> &Arc<PoolRegistry<P>> {
        &self.registry
    }

    /// The routing key for the tenant in the current scope.
    ///
    /// Without an identity in scope the default key is returned.
    pub async fn routing_key(&self) -> TenantResult<RoutingKey> {
        match scope::current_tenant_id() {
            Some(tenant_id) => self.routing_key_for(&tenant_id).await,
            None => {
                debug!("no tenant identity in scope, routing to default pool");
                Ok(RoutingKey::shared())
            }
        }
    }

    /// The routing key for an explicit tenant.
    ///
    /// Unknown tenants degrade to the default key. A dedicated-database
    /// tenant whose pool is not registered fails with
    /// [`TenantError::PoolNotProvisioned`].
    pub async fn routing_key_for(&self, tenant_id: &TenantId) -> TenantResult<RoutingKey> {
        let config = match self.provider.get_config(tenant_id).await {
            Ok(config) => config,
            Err(TenantError::NotFound(_)) => {
                warn!(tenant_id = %tenant_id, "tenant unknown, routing to default pool");
                return Ok(RoutingKey::shared());
            }
            Err(err) => return Err(err),
        };

        let key = RoutingKey::for_tenant(tenant_id, config.strategy);
        if key.is_dedicated() && !self.registry.contains(&key) {
            return Err(TenantError::PoolNotProvisioned {
                tenant_id: tenant_id.as_str().to_string(),
                routing_key: key.as_str().to_string(),
            });
        }
        Ok(key)
    }

    /// Check out a connection for the tenant in the current scope.
    ///
    /// For dedicated-schema tenants the connection comes back already
    /// switched onto the tenant's schema.
    pub async fn acquire(&self) -> TenantResult<P::Connection> {
        match scope::current_tenant_id() {
            Some(tenant_id) => self.acquire_for(&tenant_id).await,
            None => {
                debug!("no tenant identity in scope, acquiring from default pool");
                self.registry.default_pool()?.acquire().await
            }
        }
    }

    /// Check out a connection for an explicit tenant.
    pub async fn acquire_for(&self, tenant_id: &TenantId) -> TenantResult<P::Connection> {
        let config = match self.provider.get_config(tenant_id).await {
            Ok(config) => config,
            Err(TenantError::NotFound(_)) => {
                warn!(tenant_id = %tenant_id, "tenant unknown, acquiring from default pool");
                return self.registry.default_pool()?.acquire().await;
            }
            Err(err) => return Err(err),
        };

        match config.strategy {
            IsolationStrategy::DedicatedDatabase => {
                let key = RoutingKey::dedicated(tenant_id);
                let pool = self.registry.resolve(&key)?;
                debug!(tenant_id = %tenant_id, routing_key = %key, "acquiring from dedicated pool");
                pool.acquire().await
            }
            IsolationStrategy::DedicatedSchema => {
                let mut conn = self.registry.default_pool()?.acquire().await?;
                // An error here drops conn and returns it to the pool
                // without the schema marker set.
                conn.ensure_schema(&config.schema_name()).await?;
                Ok(conn)
            }
            IsolationStrategy::SharedDiscriminator => {
                self.registry.default_pool()?.acquire().await
            }
        }
    }

    /// Register a dedicated pool for a tenant and invalidate its cached
    /// config so the next checkout sees the new topology.
    pub fn provision_dedicated(&self, tenant_id: &TenantId, pool: P) -> TenantResult<RoutingKey> {
        let key = RoutingKey::dedicated(tenant_id);
        self.registry.add_pool(key.clone(), pool)?;
        self.provider.invalidate(tenant_id);
        info!(tenant_id = %tenant_id, routing_key = %key, "dedicated pool provisioned");
        Ok(key)
    }

    /// Deregister a tenant's dedicated pool, returning it for shutdown.
    pub fn decommission_dedicated(&self, tenant_id: &TenantId) -> TenantResult<Option<P>> {
        let key = RoutingKey::dedicated(tenant_id);
        let removed = self.registry.remove_pool(&key)?;
        self.provider.invalidate(tenant_id);
        if removed.is_some() {
            info!(tenant_id = %tenant_id, routing_key = %key, "dedicated pool decommissioned");
        }
        Ok(removed)
    }
}

impl<P> Clone for TenantRouter<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<P> std::fmt::Debug for TenantRouter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRouter")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{StaticDirectory, TenantRecord};
    use crate::schema::SchemaState;
    use async_trait::async_trait;

    #[derive(Clone)]
    struct FakePool {
        name: &'static str,
        fail_schema: bool,
    }

    impl FakePool {
        fn named(name: &'static str) -> Self {
            Self {
                name,
                fail_schema: false,
            }
        }
    }

    #[derive(Debug)]
    struct FakeConnection {
        pool: &'static str,
        fail_schema: bool,
        state: SchemaState,
        statements: Vec<String>,
    }

    #[async_trait]
    impl SchemaSession for FakeConnection {
        fn schema_state(&self) -> &SchemaState {
            &self.state
        }

        fn schema_state_mut(&mut self) -> &mut SchemaState {
            &mut self.state
        }

        async fn apply_schema(&mut self, sql: &str) -> TenantResult<()> {
            if self.fail_schema {
                return Err(TenantError::acquire("connection reset"));
            }
            self.statements.push(sql.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl ConnectionPool for FakePool {
        type Connection = FakeConnection;

        async fn acquire(&self) -> TenantResult<Self::Connection> {
            Ok(FakeConnection {
                pool: self.name,
                fail_schema: self.fail_schema,
                state: SchemaState::Unknown,
                statements: Vec::new(),
            })
        }
    }

    fn directory() -> StaticDirectory {
        StaticDirectory::with_records([
            TenantRecord::new("corp001", "Polar Fresh Logistics")
                .with_isolation(IsolationStrategy::DedicatedSchema),
            TenantRecord::new("corp002", "Glacier Foods")
                .with_isolation(IsolationStrategy::DedicatedDatabase),
            TenantRecord::new("corp003", "Chillstream"),
        ])
    }

    fn router() -> TenantRouter<FakePool> {
        let provider = Arc::new(TenantConfigProvider::new(Arc::new(directory())));
        let registry = Arc::new(PoolRegistry::new(FakePool::named("shared-pool")));
        TenantRouter::new(provider, registry)
    }

    #[tokio::test]
    async fn test_dedicated_schema_tenant_switches_schema() {
        let router = router();

        let conn = scope::with_tenant("corp001", async { router.acquire().await })
            .await
            .unwrap();

        assert_eq!(conn.pool, "shared-pool");
        assert!(conn.state.is_set("tenant_corp001"));
        assert_eq!(conn.statements, ["SET search_path TO tenant_corp001"]);
    }

    #[tokio::test]
    async fn test_dedicated_database_tenant_uses_own_pool() {
        let router = router();
        router
            .provision_dedicated(&TenantId::new("corp002"), FakePool::named("corp002-pool"))
            .unwrap();

        let conn = scope::with_tenant("corp002", async { router.acquire().await })
            .await
            .unwrap();

        assert_eq!(conn.pool, "corp002-pool");
        assert_eq!(conn.state, SchemaState::Unknown);
        assert!(conn.statements.is_empty());
    }

    #[tokio::test]
    async fn test_unprovisioned_dedicated_database_fails() {
        let router = router();

        let err = scope::with_tenant("corp002", async { router.acquire().await })
            .await
            .unwrap_err();
        assert!(err.is_pool_not_provisioned());

        let key_err = router
            .routing_key_for(&TenantId::new("corp002"))
            .await
            .unwrap_err();
        assert!(key_err.is_pool_not_provisioned());
    }

    #[tokio::test]
    async fn test_unknown_tenant_degrades_to_default() {
        let router = router();

        let conn = scope::with_tenant("corp999", async { router.acquire().await })
            .await
            .unwrap();
        assert_eq!(conn.pool, "shared-pool");
        assert!(conn.statements.is_empty());

        let key = scope::with_tenant("corp999", async { router.routing_key().await })
            .await
            .unwrap();
        assert!(key.is_default());
    }

    #[tokio::test]
    async fn test_no_identity_degrades_to_default() {
        let router = router();

        let conn = router.acquire().await.unwrap();
        assert_eq!(conn.pool, "shared-pool");

        let key = router.routing_key().await.unwrap();
        assert!(key.is_default());
    }

    #[tokio::test]
    async fn test_shared_tenant_uses_default_pool() {
        let router = router();

        let conn = scope::with_tenant("corp003", async { router.acquire().await })
            .await
            .unwrap();

        assert_eq!(conn.pool, "shared-pool");
        assert_eq!(conn.state, SchemaState::Unknown);
    }

    #[tokio::test]
    async fn test_routing_keys_per_strategy() {
        let router = router();
        router
            .provision_dedicated(&TenantId::new("corp002"), FakePool::named("corp002-pool"))
            .unwrap();

        let schema_key = router
            .routing_key_for(&TenantId::new("corp001"))
            .await
            .unwrap();
        assert!(schema_key.is_default());

        let db_key = router
            .routing_key_for(&TenantId::new("corp002"))
            .await
            .unwrap();
        assert_eq!(db_key.as_str(), "db_corp002");

        let shared_key = router
            .routing_key_for(&TenantId::new("corp003"))
            .await
            .unwrap();
        assert!(shared_key.is_default());
    }

    #[tokio::test]
    async fn test_schema_switch_failure_propagates() {
        let provider = Arc::new(TenantConfigProvider::new(Arc::new(directory())));
        let registry = Arc::new(PoolRegistry::new(FakePool {
            name: "shared-pool",
            fail_schema: true,
        }));
        let router = TenantRouter::new(provider, registry);

        let err = scope::with_tenant("corp001", async { router.acquire().await })
            .await
            .unwrap_err();
        assert!(err.is_schema_switch());
    }

    #[tokio::test]
    async fn test_decommission_restores_unprovisioned_error() {
        let router = router();
        let tenant_id = TenantId::new("corp002");
        router
            .provision_dedicated(&tenant_id, FakePool::named("corp002-pool"))
            .unwrap();

        let removed = router.decommission_dedicated(&tenant_id).unwrap();
        assert_eq!(removed.map(|p| p.name), Some("corp002-pool"));

        let err = router.acquire_for(&tenant_id).await.unwrap_err();
        assert!(err.is_pool_not_provisioned());
    }
}

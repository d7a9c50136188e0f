//! # coldchain-tenant
//!
//! Multi-tenant routing core for the coldchain platform.
//!
//! This crate decides where a tenant's database traffic goes. It provides:
//! - Task-scoped tenant identity propagation
//! - Cached tenant routing configuration with negative caching
//! - A pool registry keyed by routing key, with a protected default pool
//! - A router that picks the pool (and schema) for the current tenant
//! - Request-side tenant extraction for the HTTP layer to plug into
//!
//! Three isolation strategies are supported:
//!
//! - **Dedicated database**: the tenant has its own database and its own
//!   pool under the `db_<tenant_id>` routing key
//! - **Dedicated schema**: the tenant shares the default pool; connections
//!   are switched onto the tenant's schema before use
//! - **Shared discriminator**: the tenant shares the default pool and
//!   tables; row filtering is the application's concern
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coldchain_tenant::{
//!     PoolRegistry, StaticDirectory, TenantConfigProvider, TenantRouter, scope,
//! };
//!
//! let provider = Arc::new(TenantConfigProvider::new(Arc::new(directory)));
//! let registry = Arc::new(PoolRegistry::new(shared_pool));
//! let router = TenantRouter::new(provider, registry);
//!
//! let rows = scope::with_tenant("corp001", async {
//!     let mut conn = router.acquire().await?;
//!     conn.query("SELECT * FROM shipments", &[]).await
//! })
//! .await?;
//! ```
//!
//! ## Tenant Identity
//!
//! Identity lives in task-local storage and is bounded by a scope; it is
//! gone when the scope returns, errors, or is cancelled:
//!
//! ```rust,ignore
//! use coldchain_tenant::scope;
//!
//! scope::with_tenant("corp001", async {
//!     assert_eq!(scope::current_tenant_id().unwrap().as_str(), "corp001");
//! })
//! .await;
//! assert!(scope::current_tenant_id().is_none());
//! ```
//!
//! ## Isolation Strategies
//!
//! ```rust
//! use coldchain_tenant::IsolationStrategy;
//!
//! assert_eq!(IsolationStrategy::from_code(1), IsolationStrategy::DedicatedDatabase);
//! assert_eq!(IsolationStrategy::from_code(9), IsolationStrategy::SharedDiscriminator);
//! assert_eq!(IsolationStrategy::DedicatedSchema.code(), 2);
//! ```
//!
//! ## Routing Keys
//!
//! ```rust
//! use coldchain_tenant::{IsolationStrategy, RoutingKey, TenantId};
//!
//! let tenant = TenantId::new("corp002");
//!
//! let key = RoutingKey::for_tenant(&tenant, IsolationStrategy::DedicatedDatabase);
//! assert_eq!(key.as_str(), "db_corp002");
//!
//! let key = RoutingKey::for_tenant(&tenant, IsolationStrategy::DedicatedSchema);
//! assert!(key.is_default());
//! ```
//!
//! ## Request Extraction
//!
//! ```rust
//! use coldchain_tenant::{CompositeExtractor, RequestParts};
//!
//! let extractor = CompositeExtractor::standard();
//! let parts = RequestParts::new("/api/devices").with_header("X-Tenant-Id", "corp001");
//!
//! let resolved = extractor.resolve(&parts);
//! assert_eq!(resolved.tenant_id_str(), "corp001");
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use coldchain_tenant::TenantError;
//!
//! let err = TenantError::pool_not_provisioned("corp002", "db_corp002");
//! assert!(err.is_pool_not_provisioned());
//! assert!(err.is_isolation_error());
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pool;
pub mod provider;
pub mod registry;
pub mod router;
pub mod schema;
pub mod scope;
pub mod strategy;

// Core types
pub use config::{TenantFeatures, TenantLimits, TenantRoutingConfig};
pub use context::{TenantId, TenantIdentity};
pub use directory::{
    DirectoryFn, StaticDirectory, TenantDirectory, TenantPlan, TenantRecord, TenantStatus,
};
pub use error::{TenantError, TenantResult};
pub use strategy::IsolationStrategy;

// Routing
pub use cache::{CacheConfig, CacheLookup, CacheMetrics, ConfigCache};
pub use pool::ConnectionPool;
pub use provider::TenantConfigProvider;
pub use registry::{PoolRegistry, RoutingKey};
pub use router::TenantRouter;
pub use schema::{quote_ident, schema_switch_sql, SchemaSession, SchemaState};

// Identity scope
pub use scope::{
    current_identity, current_tenant_id, has_identity, require_identity, with_current_identity,
    with_identity, with_tenant, IdentityNotSetError, IdentityScope,
};

// Request extraction
pub use extract::{
    ClaimExtractor, CompositeExtractor, HeaderExtractor, RequestParts, ResolvedTenant,
    SubdomainExtractor, TenantExtractor, TenantSource, UrlPathExtractor,
};

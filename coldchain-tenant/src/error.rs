//! Error types for tenant routing operations.

use thiserror::Error;

/// Result type for tenant routing operations.
pub type TenantResult<T> = Result<T, TenantError>;

/// Errors that can occur while resolving and routing tenant traffic.
#[derive(Error, Debug)]
pub enum TenantError {
    /// The tenant id is not known to the tenant directory.
    #[error("tenant {0:?} not found")]
    NotFound(String),

    /// A dedicated-database tenant's pool has not been provisioned.
    ///
    /// This is never downgraded to the shared default pool: running a
    /// dedicated-database tenant against shared storage would leak data
    /// across tenants.
    #[error("no pool provisioned for routing key {routing_key:?} (tenant {tenant_id:?})")]
    PoolNotProvisioned {
        /// Tenant whose pool is missing.
        tenant_id: String,
        /// Routing key that failed to resolve.
        routing_key: String,
    },

    /// The schema-switch command failed on a connection.
    ///
    /// The statement it guarded must not run: proceeding on the wrong
    /// schema risks cross-tenant data corruption.
    #[error("schema switch to {schema:?} failed: {message}")]
    SchemaSwitch {
        /// Schema that was being switched to.
        schema: String,
        /// Driver-reported failure.
        message: String,
    },

    /// The tenant directory failed for a reason other than a missing tenant.
    #[error("tenant directory error: {0}")]
    Directory(String),

    /// Invalid pool registry operation.
    #[error("pool registry error: {0}")]
    Registry(String),

    /// Checking a connection out of a pool failed.
    #[error("connection acquire failed: {0}")]
    Acquire(String),

    /// The underlying database driver reported an error.
    #[error("database driver error: {0}")]
    Driver(String),
}

impl TenantError {
    /// Create a not-found error.
    pub fn not_found(tenant_id: impl Into<String>) -> Self {
        Self::NotFound(tenant_id.into())
    }

    /// Create a pool-not-provisioned error.
    pub fn pool_not_provisioned(
        tenant_id: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self::PoolNotProvisioned {
            tenant_id: tenant_id.into(),
            routing_key: routing_key.into(),
        }
    }

    /// Create a schema-switch error.
    pub fn schema_switch(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaSwitch {
            schema: schema.into(),
            message: message.into(),
        }
    }

    /// Create a directory error.
    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory(message.into())
    }

    /// Create a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry(message.into())
    }

    /// Create an acquire error.
    pub fn acquire(message: impl Into<String>) -> Self {
        Self::Acquire(message.into())
    }

    /// Create a driver error.
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a pool-not-provisioned error.
    pub fn is_pool_not_provisioned(&self) -> bool {
        matches!(self, Self::PoolNotProvisioned { .. })
    }

    /// Check if this is a schema-switch error.
    pub fn is_schema_switch(&self) -> bool {
        matches!(self, Self::SchemaSwitch { .. })
    }

    /// Check if this error is fatal to the current unit of work because
    /// continuing would break tenant isolation.
    pub fn is_isolation_error(&self) -> bool {
        matches!(
            self,
            Self::PoolNotProvisioned { .. } | Self::SchemaSwitch { .. }
        )
    }
}

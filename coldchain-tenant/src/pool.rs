//! Connection pool abstraction.
//!
//! The router only needs two things from a pool: hand out connections, and
//! hand out connections whose schema can be switched. Keeping that behind
//! a trait keeps the routing core independent of the driver; the
//! `coldchain-postgres` crate provides the deadpool-backed implementation.

use async_trait::async_trait;

use crate::error::TenantResult;
use crate::schema::SchemaSession;

/// A pool of database connections.
///
/// Handles are expected to be cheap to clone; the registry stores one per
/// routing key and clones it on every resolve.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// The checked-out connection type.
    type Connection: SchemaSession + Send;

    /// Check a connection out of the pool.
    ///
    /// The connection starts at [`SchemaState::Unknown`] regardless of what
    /// previous checkouts did with it.
    ///
    /// [`SchemaState::Unknown`]: crate::schema::SchemaState::Unknown
    async fn acquire(&self) -> TenantResult<Self::Connection>;
}

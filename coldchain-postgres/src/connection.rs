//! PostgreSQL connection wrapper.

use async_trait::async_trait;
use coldchain_tenant::{SchemaSession, SchemaState, TenantError, TenantResult};
use deadpool_postgres::Object;
use tokio_postgres::Row;
use tracing::debug;

use crate::error::PgResult;

/// A pooled PostgreSQL connection with a tenant schema marker.
///
/// The marker starts at [`SchemaState::Unknown`] on every checkout, so the
/// first [`ensure_schema`] call after checkout always issues the switch
/// regardless of what previous checkouts left on the server session.
///
/// [`ensure_schema`]: SchemaSession::ensure_schema
pub struct PgConnection {
    client: Object,
    schema: SchemaState,
}

impl PgConnection {
    /// Create a new connection wrapper.
    pub(crate) fn new(client: Object) -> Self {
        Self {
            client,
            schema: SchemaState::Unknown,
        }
    }

    /// Execute a query and return all rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, "Executing query");
        let rows = self.client.query(sql, params).await?;
        Ok(rows)
    }

    /// Execute a query and return exactly one row.
    pub async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<Row> {
        debug!(sql = %sql, "Executing query_one");
        let row = self.client.query_one(sql, params).await?;
        Ok(row)
    }

    /// Execute a query and return zero or one row.
    pub async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<Option<Row>> {
        debug!(sql = %sql, "Executing query_opt");
        let row = self.client.query_opt(sql, params).await?;
        Ok(row)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let count = self.client.execute(sql, params).await?;
        Ok(count)
    }

    /// Execute a batch of statements in a single round-trip.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        debug!(sql = %sql, "Executing batch");
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    /// Begin a transaction.
    ///
    /// The transaction runs on whatever schema the connection is currently
    /// switched to.
    pub async fn transaction(&mut self) -> PgResult<PgTransaction<'_>> {
        debug!("Beginning transaction");
        let txn = self.client.transaction().await?;
        Ok(PgTransaction { txn })
    }

    /// Get the underlying tokio-postgres client.
    ///
    /// This is useful for advanced operations not covered by this wrapper.
    pub fn inner(&self) -> &Object {
        &self.client
    }
}

#[async_trait]
impl SchemaSession for PgConnection {
    fn schema_state(&self) -> &SchemaState {
        &self.schema
    }

    fn schema_state_mut(&mut self) -> &mut SchemaState {
        &mut self.schema
    }

    async fn apply_schema(&mut self, sql: &str) -> TenantResult<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| TenantError::driver(e.to_string()))
    }
}

/// A PostgreSQL transaction.
pub struct PgTransaction<'a> {
    txn: deadpool_postgres::Transaction<'a>,
}

impl<'a> PgTransaction<'a> {
    /// Execute a query and return all rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, "Executing query in transaction");
        let rows = self.txn.query(sql, params).await?;
        Ok(rows)
    }

    /// Execute a query and return exactly one row.
    pub async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<Row> {
        let row = self.txn.query_one(sql, params).await?;
        Ok(row)
    }

    /// Execute a query and return zero or one row.
    pub async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<Option<Row>> {
        let row = self.txn.query_opt(sql, params).await?;
        Ok(row)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> PgResult<u64> {
        let count = self.txn.execute(sql, params).await?;
        Ok(count)
    }

    /// Commit the transaction.
    pub async fn commit(self) -> PgResult<()> {
        debug!("Committing transaction");
        self.txn.commit().await?;
        Ok(())
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> PgResult<()> {
        debug!("Rolling back transaction");
        self.txn.rollback().await?;
        Ok(())
    }
}

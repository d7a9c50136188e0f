//! Error types for PostgreSQL operations.

use coldchain_tenant::TenantError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Pool(_) | Self::Connection(_))
    }
}

impl From<PgError> for TenantError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Pool(e) => TenantError::acquire(e.to_string()),
            PgError::Postgres(e) => TenantError::driver(e.to_string()),
            PgError::Config(msg) => TenantError::acquire(msg),
            PgError::Connection(msg) => TenantError::acquire(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("invalid URL");
        assert!(matches!(err, PgError::Config(_)));

        let err = PgError::connection("connection refused");
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_into_tenant_error() {
        let pg_err = PgError::connection("connection refused");
        let tenant_err: TenantError = pg_err.into();
        assert!(matches!(tenant_err, TenantError::Acquire(_)));
        assert!(tenant_err.to_string().contains("connection refused"));
    }
}

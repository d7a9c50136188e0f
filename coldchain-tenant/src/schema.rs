//! Per-connection schema switching for dedicated-schema tenants.
//!
//! Dedicated-schema tenants share the default pool, so every connection
//! checked out for them must be switched onto the tenant's schema before a
//! statement runs. The switch marker lives on the connection itself as a
//! [`SchemaState`]: every checkout starts at [`SchemaState::Unknown`], and
//! [`SchemaSession::ensure_schema`] issues the `SET search_path` statement
//! at most once per checkout.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{TenantError, TenantResult};

/// What schema a connection is known to be on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SchemaState {
    /// Nothing has been verified on this checkout.
    #[default]
    Unknown,
    /// The switch statement for this schema completed.
    Set(String),
}

impl SchemaState {
    /// Whether this connection is known to be on the given schema.
    pub fn is_set(&self, schema: &str) -> bool {
        matches!(self, Self::Set(current) if current == schema)
    }

    /// The schema this connection is on, when known.
    pub fn as_set(&self) -> Option<&str> {
        match self {
            Self::Set(schema) => Some(schema.as_str()),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for SchemaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Set(schema) => write!(f, "{}", schema),
        }
    }
}

/// Quote a schema or table identifier for PostgreSQL.
pub fn quote_ident(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if bare {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// The statement that moves a connection onto a tenant schema.
pub fn schema_switch_sql(schema: &str) -> String {
    format!("SET search_path TO {}", quote_ident(schema))
}

/// A checked-out connection that can be switched between schemas.
///
/// Implementors store a [`SchemaState`] next to the raw connection and run
/// the switch statement in `apply_schema`. The [`ensure_schema`] logic is
/// provided and must not be overridden lightly: it keeps the state honest
/// when the switch fails or the future is dropped mid-flight.
///
/// [`ensure_schema`]: SchemaSession::ensure_schema
#[async_trait]
pub trait SchemaSession: Send {
    /// The schema this connection is known to be on.
    fn schema_state(&self) -> &SchemaState;

    /// Mutable access to the schema marker.
    fn schema_state_mut(&mut self) -> &mut SchemaState;

    /// Run a schema-switch statement on the underlying connection.
    async fn apply_schema(&mut self, sql: &str) -> TenantResult<()>;

    /// Put this connection on `schema`, issuing the switch at most once.
    ///
    /// The marker is cleared before the statement is sent and only set
    /// after the driver confirms it. A cancelled or failed switch leaves
    /// the connection at [`SchemaState::Unknown`], so the next call
    /// switches again instead of trusting a half-applied state.
    ///
    /// On failure the statement that prompted the switch must not run;
    /// callers get [`TenantError::SchemaSwitch`] and should drop the
    /// connection.
    async fn ensure_schema(&mut self, schema: &str) -> TenantResult<()> {
        if self.schema_state().is_set(schema) {
            return Ok(());
        }

        *self.schema_state_mut() = SchemaState::Unknown;

        let sql = schema_switch_sql(schema);
        match self.apply_schema(&sql).await {
            Ok(()) => {
                debug!(schema = %schema, sql = %sql, "schema switched");
                *self.schema_state_mut() = SchemaState::Set(schema.to_string());
                Ok(())
            }
            Err(err) => Err(TenantError::schema_switch(schema, err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSession {
        state: SchemaState,
        statements: Vec<String>,
        fail: bool,
    }

    impl FakeSession {
        fn new() -> Self {
            Self {
                state: SchemaState::Unknown,
                statements: Vec::new(),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl SchemaSession for FakeSession {
        fn schema_state(&self) -> &SchemaState {
            &self.state
        }

        fn schema_state_mut(&mut self) -> &mut SchemaState {
            &mut self.state
        }

        async fn apply_schema(&mut self, sql: &str) -> TenantResult<()> {
            if self.fail {
                return Err(TenantError::acquire("connection reset"));
            }
            self.statements.push(sql.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("tenant_corp001"), "tenant_corp001");
        assert_eq!(quote_ident("Tenant"), "\"Tenant\"");
        assert_eq!(quote_ident("1tenant"), "\"1tenant\"");
        assert_eq!(quote_ident("ten\"ant"), "\"ten\"\"ant\"");
        assert_eq!(quote_ident(""), "\"\"");
    }

    #[test]
    fn test_schema_switch_sql() {
        assert_eq!(
            schema_switch_sql("tenant_corp001"),
            "SET search_path TO tenant_corp001"
        );
        assert_eq!(
            schema_switch_sql("Tenant-A"),
            "SET search_path TO \"Tenant-A\""
        );
    }

    #[tokio::test]
    async fn test_ensure_schema_switches_once() {
        let mut session = FakeSession::new();

        session.ensure_schema("tenant_corp001").await.unwrap();
        session.ensure_schema("tenant_corp001").await.unwrap();

        assert_eq!(session.statements, ["SET search_path TO tenant_corp001"]);
        assert!(session.state.is_set("tenant_corp001"));
    }

    #[tokio::test]
    async fn test_ensure_schema_switches_again_for_new_schema() {
        let mut session = FakeSession::new();

        session.ensure_schema("tenant_corp001").await.unwrap();
        session.ensure_schema("tenant_corp002").await.unwrap();

        assert_eq!(
            session.statements,
            [
                "SET search_path TO tenant_corp001",
                "SET search_path TO tenant_corp002"
            ]
        );
        assert!(session.state.is_set("tenant_corp002"));
    }

    #[tokio::test]
    async fn test_failed_switch_resets_state() {
        let mut session = FakeSession::new();
        session.ensure_schema("tenant_corp001").await.unwrap();

        session.fail = true;
        let err = session.ensure_schema("tenant_corp002").await.unwrap_err();

        assert!(err.is_schema_switch());
        assert!(err.is_isolation_error());
        assert_eq!(session.state, SchemaState::Unknown);
    }
}

//! Tenant identity types for the active unit of work.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a tenant, e.g. `corp001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a new tenant ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<uuid::Uuid> for TenantId {
    fn from(u: uuid::Uuid) -> Self {
        Self::new(u.to_string())
    }
}

impl From<i64> for TenantId {
    fn from(i: i64) -> Self {
        Self::new(i.to_string())
    }
}

impl From<i32> for TenantId {
    fn from(i: i32) -> Self {
        Self::new(i.to_string())
    }
}

/// The identity active for one unit of work.
///
/// Carries the tenant plus the authenticated user, when one is known.
/// An identity exists only for the duration of a single request/task scope
/// (see [`crate::scope`]) and is never shared between concurrent units of
/// work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantIdentity {
    /// The tenant this unit of work belongs to.
    pub tenant_id: TenantId,
    /// The authenticated user id, if known.
    pub user_id: Option<i64>,
    /// The authenticated username, if known.
    pub username: Option<String>,
}

impl TenantIdentity {
    /// Create an identity with just a tenant id.
    pub fn new(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: None,
            username: None,
        }
    }

    /// Set the authenticated user id.
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the authenticated username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl fmt::Display for TenantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant={}", self.tenant_id)?;
        if let Some(user_id) = self.user_id {
            write!(f, " user_id={}", user_id)?;
        }
        if let Some(ref username) = self.username {
            write!(f, " username={}", username)?;
        }
        Ok(())
    }
}

impl From<TenantId> for TenantIdentity {
    fn from(tenant_id: TenantId) -> Self {
        Self::new(tenant_id)
    }
}

impl From<&str> for TenantIdentity {
    fn from(tenant_id: &str) -> Self {
        Self::new(tenant_id)
    }
}

//! Task-scoped tenant identity propagation.
//!
//! The active [`TenantIdentity`] is held in Tokio task-local storage, so each
//! concurrent unit of work sees exactly its own identity with no locking and
//! no process-global state.
//!
//! Identity is installed with a scope rather than a set/clear pair:
//! [`with_identity`] runs a future with the identity in place and removes it
//! when the future finishes, whether it returns, fails, panics, or is
//! cancelled. There is no code path on which a stale identity survives into
//! the next unit of work scheduled on the same worker thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use coldchain_tenant::scope::{with_identity, current_tenant_id};
//! use coldchain_tenant::TenantIdentity;
//!
//! let identity = TenantIdentity::new("corp001").with_user_id(42);
//! with_identity(identity, async {
//!     // Every data-access call in this block routes as corp001.
//!     let conn = router.acquire().await?;
//!     Ok(())
//! }).await?;
//! // Identity is gone here, even if the block returned early.
//! ```

use std::future::Future;

use crate::context::{TenantId, TenantIdentity};

tokio::task_local! {
    /// Task-local identity for the current unit of work.
    static IDENTITY: TenantIdentity;
}

/// Execute an async block with the given identity active.
///
/// The identity is visible to all nested calls through
/// [`current_identity`] and is removed on every exit path.
pub async fn with_identity<F, T>(identity: impl Into<TenantIdentity>, f: F) -> T
where
    F: Future<Output = T>,
{
    IDENTITY.scope(identity.into(), f).await
}

/// Execute an async block with just a tenant id active.
///
/// Shorthand for [`with_identity`] when no user information is available.
pub async fn with_tenant<F, T>(tenant_id: impl Into<TenantId>, f: F) -> T
where
    F: Future<Output = T>,
{
    IDENTITY.scope(TenantIdentity::new(tenant_id), f).await
}

/// Get the identity for the current unit of work, if one is active.
///
/// Returns `None` outside any identity scope. Absence is a well-defined
/// state: collaborators such as health checks and registration endpoints run
/// without a tenant and fall back to shared defaults downstream.
#[inline]
pub fn current_identity() -> Option<TenantIdentity> {
    IDENTITY.try_with(|identity| identity.clone()).ok()
}

/// Get the current tenant id, if an identity is active.
///
/// Cheaper than [`current_identity`] when only the id is needed.
#[inline]
pub fn current_tenant_id() -> Option<TenantId> {
    IDENTITY.try_with(|identity| identity.tenant_id.clone()).ok()
}

/// Check whether an identity is active for the current unit of work.
#[inline]
pub fn has_identity() -> bool {
    IDENTITY.try_with(|_| ()).is_ok()
}

/// Execute a closure against the current identity without cloning it.
///
/// Returns `None` if no identity is active.
#[inline]
pub fn with_current_identity<F, T>(f: F) -> Option<T>
where
    F: FnOnce(&TenantIdentity) -> T,
{
    IDENTITY.try_with(f).ok()
}

/// Require an active identity, returning an error if none is set.
///
/// Pipelines that must not reach the data layer unauthenticated call this
/// before routing, turning the missing-identity degrade into a hard failure
/// at the boundary where it belongs.
#[inline]
pub fn require_identity() -> Result<TenantIdentity, IdentityNotSetError> {
    current_identity().ok_or(IdentityNotSetError)
}

/// Error returned when an identity is required but not set.
#[derive(Debug, Clone, Copy)]
pub struct IdentityNotSetError;

impl std::fmt::Display for IdentityNotSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tenant identity not set")
    }
}

impl std::error::Error for IdentityNotSetError {}

/// A reusable identity scope.
///
/// Alternative to [`with_identity`] when the same identity is applied to
/// several futures, e.g. a worker draining a tenant's message batch.
#[derive(Debug, Clone)]
pub struct IdentityScope {
    identity: TenantIdentity,
}

impl IdentityScope {
    /// Create a scope for the given identity.
    pub fn new(identity: impl Into<TenantIdentity>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    /// Get the tenant id this scope applies.
    pub fn tenant_id(&self) -> &TenantId {
        &self.identity.tenant_id
    }

    /// Get the identity this scope applies.
    pub fn identity(&self) -> &TenantIdentity {
        &self.identity
    }

    /// Run an async function within this scope.
    pub async fn run<F, T>(&self, f: F) -> T
    where
        F: Future<Output = T>,
    {
        IDENTITY.scope(self.identity.clone(), f).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_identity() {
        let result = with_identity(TenantIdentity::new("corp001").with_user_id(1), async {
            current_identity()
        })
        .await;

        let identity = result.unwrap();
        assert_eq!(identity.tenant_id.as_str(), "corp001");
        assert_eq!(identity.user_id, Some(1));
    }

    #[tokio::test]
    async fn test_no_identity() {
        assert!(current_identity().is_none());
        assert!(current_tenant_id().is_none());
        assert!(!has_identity());
        assert!(require_identity().is_err());
    }

    #[tokio::test]
    async fn test_cleared_after_scope() {
        with_tenant("corp001", async {
            assert!(has_identity());
        })
        .await;

        assert!(!has_identity());
        assert!(current_identity().is_none());
    }

    #[tokio::test]
    async fn test_cleared_after_error() {
        let result: Result<(), &str> = with_tenant("corp001", async {
            assert!(has_identity());
            Err("boom")
        })
        .await;

        assert!(result.is_err());
        assert!(!has_identity());
    }

    #[tokio::test]
    async fn test_cleared_after_cancellation() {
        let handle = tokio::spawn(with_tenant("corp001", async {
            std::future::pending::<()>().await;
        }));

        handle.abort();
        assert!(handle.await.is_err());

        // The cancelled scope never leaks into this task.
        assert!(!has_identity());
    }

    #[tokio::test]
    async fn test_nested_scopes() {
        with_tenant("outer", async {
            assert_eq!(current_tenant_id().unwrap().as_str(), "outer");

            with_tenant("inner", async {
                assert_eq!(current_tenant_id().unwrap().as_str(), "inner");
            })
            .await;

            assert_eq!(current_tenant_id().unwrap().as_str(), "outer");
        })
        .await;
    }

    #[tokio::test]
    async fn test_concurrent_tasks_are_isolated() {
        let tasks = (0..8).map(|i| {
            tokio::spawn(with_tenant(format!("corp{:03}", i), async move {
                tokio::task::yield_now().await;
                let seen = current_tenant_id().unwrap();
                assert_eq!(seen.as_str(), format!("corp{:03}", i));
            }))
        });

        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }
    }

    #[tokio::test]
    async fn test_identity_scope() {
        let scope = IdentityScope::new(TenantIdentity::new("corp001").with_username("ops"));
        assert_eq!(scope.tenant_id().as_str(), "corp001");

        let first = scope.run(async { current_tenant_id() }).await;
        let second = scope.run(async { current_tenant_id() }).await;

        assert_eq!(first.unwrap().as_str(), "corp001");
        assert_eq!(second.unwrap().as_str(), "corp001");
    }
}

//! Tenant directory access.
//!
//! The directory is the authoritative registry of tenants. The core only
//! reads it through the [`TenantDirectory`] trait, so the backing store can
//! be a management database, a control-plane service, or an in-memory map
//! in tests. [`StaticDirectory`] is the bundled in-memory implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TenantLimits;
use crate::context::TenantId;
use crate::error::{TenantError, TenantResult};
use crate::strategy::IsolationStrategy;

/// Lifecycle state of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    /// Administratively disabled.
    Disabled,
    /// Serving traffic.
    Active,
    /// Subscription lapsed.
    Expired,
    /// Registered, awaiting review.
    Pending,
    /// Soft-deleted.
    Deleted,
}

impl TenantStatus {
    /// Decode a directory status code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Disabled),
            1 => Some(Self::Active),
            2 => Some(Self::Expired),
            3 => Some(Self::Pending),
            4 => Some(Self::Deleted),
            _ => None,
        }
    }

    /// The directory status code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Active => 1,
            Self::Expired => 2,
            Self::Pending => 3,
            Self::Deleted => 4,
        }
    }
}

impl Default for TenantStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Subscription plan of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantPlan {
    /// Free evaluation plan.
    Trial,
    /// Paid standard plan.
    Standard,
    /// Paid enterprise plan.
    Enterprise,
}

impl TenantPlan {
    /// Decode a directory plan code, treating unknown codes as trial.
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Standard,
            3 => Self::Enterprise,
            _ => Self::Trial,
        }
    }

    /// The directory plan code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Trial => 1,
            Self::Standard => 2,
            Self::Enterprise => 3,
        }
    }

    /// Monthly price in the platform's billing currency.
    pub fn monthly_price(&self) -> u32 {
        match self {
            Self::Trial => 0,
            Self::Standard => 999,
            Self::Enterprise => 2999,
        }
    }
}

impl Default for TenantPlan {
    fn default() -> Self {
        Self::Trial
    }
}

/// One tenant's row in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Tenant identifier.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Lifecycle state.
    pub status: TenantStatus,
    /// Subscription plan.
    pub plan: TenantPlan,
    /// Isolation strategy.
    pub isolation: IsolationStrategy,
    /// Physical database name for dedicated-database tenants.
    pub database_name: Option<String>,
    /// Physical schema name for dedicated-schema tenants.
    pub schema_name: Option<String>,
    /// Resource quotas.
    pub limits: TenantLimits,
    /// Operational contact.
    pub contact_email: Option<String>,
    /// Subscription end, when the plan has one.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TenantRecord {
    /// Create an active shared-discriminator record with default limits.
    pub fn new(tenant_id: impl Into<TenantId>, name: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            name: name.into(),
            status: TenantStatus::default(),
            plan: TenantPlan::default(),
            isolation: IsolationStrategy::default(),
            database_name: None,
            schema_name: None,
            limits: TenantLimits::default(),
            contact_email: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Set the lifecycle state.
    pub fn with_status(mut self, status: TenantStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the subscription plan.
    pub fn with_plan(mut self, plan: TenantPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Set the isolation strategy.
    pub fn with_isolation(mut self, isolation: IsolationStrategy) -> Self {
        self.isolation = isolation;
        self
    }

    /// Set the physical database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database_name = Some(database.into());
        self
    }

    /// Set the physical schema name.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }

    /// Set the resource quotas.
    pub fn with_limits(mut self, limits: TenantLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the operational contact.
    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// Set the subscription end.
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the tenant is active and unexpired.
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
            && self.expires_at.is_none_or(|expires_at| expires_at > Utc::now())
    }
}

/// Read access to the tenant directory.
///
/// `fetch` returns [`TenantError::NotFound`] only when the directory
/// authoritatively knows the tenant does not exist. Transient failures
/// (connectivity, timeouts) surface as [`TenantError::Directory`] so the
/// caller can distinguish "gone" from "unreachable".
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Fetch the directory record for a tenant.
    async fn fetch(&self, tenant_id: &TenantId) -> TenantResult<TenantRecord>;

    /// Whether the tenant exists.
    async fn contains(&self, tenant_id: &TenantId) -> bool {
        self.fetch(tenant_id).await.is_ok()
    }
}

/// In-memory directory backed by a map.
///
/// # Example
///
/// ```
/// use coldchain_tenant::directory::{StaticDirectory, TenantRecord};
///
/// let directory = StaticDirectory::new();
/// directory.insert(TenantRecord::new("corp001", "Polar Fresh Logistics"));
/// assert_eq!(directory.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct StaticDirectory {
    records: RwLock<HashMap<String, TenantRecord>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create a directory pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = TenantRecord>) -> Self {
        let directory = Self::new();
        for record in records {
            directory.insert(record);
        }
        directory
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: TenantRecord) {
        let mut records = self.records.write().expect("lock poisoned");
        records.insert(record.tenant_id.as_str().to_string(), record);
    }

    /// Remove a record.
    pub fn remove(&self, tenant_id: &TenantId) -> Option<TenantRecord> {
        let mut records = self.records.write().expect("lock poisoned");
        records.remove(tenant_id.as_str())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }
}

#[async_trait]
impl TenantDirectory for StaticDirectory {
    async fn fetch(&self, tenant_id: &TenantId) -> TenantResult<TenantRecord> {
        let records = self.records.read().expect("lock poisoned");
        records
            .get(tenant_id.as_str())
            .cloned()
            .ok_or_else(|| TenantError::not_found(tenant_id.as_str()))
    }
}

/// Directory backed by an async closure.
///
/// Useful for wiring the core to an existing lookup without a dedicated
/// directory type.
pub struct DirectoryFn<F> {
    f: F,
}

impl<F> DirectoryFn<F> {
    /// Wrap a fetch closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for DirectoryFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> TenantDirectory for DirectoryFn<F>
where
    F: Fn(TenantId) -> Fut + Send + Sync,
    Fut: Future<Output = TenantResult<TenantRecord>> + Send,
{
    async fn fetch(&self, tenant_id: &TenantId) -> TenantResult<TenantRecord> {
        (self.f)(tenant_id.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(TenantStatus::from_code(1), Some(TenantStatus::Active));
        assert_eq!(TenantStatus::from_code(4), Some(TenantStatus::Deleted));
        assert_eq!(TenantStatus::from_code(9), None);
        assert_eq!(TenantStatus::Expired.code(), 2);
        assert_eq!(TenantStatus::Pending.code(), 3);
    }

    #[test]
    fn test_plan_codes_and_prices() {
        assert_eq!(TenantPlan::from_code(2), TenantPlan::Standard);
        assert_eq!(TenantPlan::from_code(3), TenantPlan::Enterprise);
        // Unknown plan codes behave like trials
        assert_eq!(TenantPlan::from_code(7), TenantPlan::Trial);

        assert_eq!(TenantPlan::Trial.monthly_price(), 0);
        assert_eq!(TenantPlan::Standard.monthly_price(), 999);
        assert_eq!(TenantPlan::Enterprise.monthly_price(), 2999);
    }

    #[test]
    fn test_is_active() {
        let record = TenantRecord::new("corp001", "Polar Fresh Logistics");
        assert!(record.is_active());

        let disabled = record.clone().with_status(TenantStatus::Disabled);
        assert!(!disabled.is_active());

        let expired = record
            .clone()
            .with_expires_at(Utc::now() - Duration::days(1));
        assert!(!expired.is_active());

        let current = record.with_expires_at(Utc::now() + Duration::days(30));
        assert!(current.is_active());
    }

    #[tokio::test]
    async fn test_static_directory_fetch() {
        let directory = StaticDirectory::with_records([
            TenantRecord::new("corp001", "Polar Fresh Logistics"),
            TenantRecord::new("corp002", "Glacier Foods"),
        ]);

        let record = directory
            .fetch(&TenantId::new("corp001"))
            .await
            .expect("fetch should succeed");
        assert_eq!(record.name, "Polar Fresh Logistics");
        assert!(directory.contains(&TenantId::new("corp002")).await);
    }

    #[tokio::test]
    async fn test_static_directory_not_found() {
        let directory = StaticDirectory::new();
        let err = directory
            .fetch(&TenantId::new("ghost"))
            .await
            .expect_err("fetch should fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_static_directory_remove() {
        let directory = StaticDirectory::new();
        directory.insert(TenantRecord::new("corp001", "Polar Fresh Logistics"));
        assert!(directory.remove(&TenantId::new("corp001")).is_some());
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn test_directory_fn() {
        let directory = DirectoryFn::new(|tenant_id: TenantId| async move {
            if tenant_id.as_str() == "corp001" {
                Ok(TenantRecord::new(tenant_id, "Polar Fresh Logistics"))
            } else {
                Err(TenantError::not_found(tenant_id.as_str()))
            }
        });

        assert!(directory.fetch(&TenantId::new("corp001")).await.is_ok());
        assert!(directory.fetch(&TenantId::new("corp009")).await.is_err());
    }
}

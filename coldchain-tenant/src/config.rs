//! Tenant routing configuration and plan entitlements.
//!
//! [`TenantRoutingConfig`] is the immutable snapshot the rest of the core
//! consumes: which isolation strategy a tenant uses and where its data
//! physically lives. It is produced from a [`TenantRecord`] by the
//! configuration provider and cached there; nothing else talks to the
//! tenant registry.

use serde::{Deserialize, Serialize};

use crate::context::TenantId;
use crate::directory::{TenantPlan, TenantRecord};
use crate::strategy::IsolationStrategy;

/// Resource quotas attached to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantLimits {
    /// Maximum pooled connections a dedicated pool should be sized to.
    pub max_connections: u32,
    /// Maximum API requests per second.
    pub max_api_qps: u32,
    /// Maximum user accounts.
    pub max_users: u32,
    /// Maximum registered cold-chain devices.
    pub max_devices: u32,
    /// Maximum registered vehicles.
    pub max_vehicles: u32,
    /// Maximum alert rules.
    pub max_alert_rules: u32,
    /// Telemetry retention window in days.
    pub data_retention_days: u32,
}

impl Default for TenantLimits {
    fn default() -> Self {
        Self {
            max_connections: 50,
            max_api_qps: 100,
            max_users: 10,
            max_devices: 100,
            max_vehicles: 10,
            max_alert_rules: 20,
            data_retention_days: 30,
        }
    }
}

/// Feature switches derived from a tenant's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantFeatures {
    /// Device registration and management.
    pub device_management: bool,
    /// Alert rule management.
    pub alert_management: bool,
    /// Telemetry data export.
    pub data_export: bool,
    /// External API access.
    pub api_access: bool,
    /// Report and trend analysis.
    pub report_analysis: bool,
    /// Advanced platform features.
    pub advanced_features: bool,
}

impl TenantFeatures {
    /// The feature set a plan entitles a tenant to.
    pub fn for_plan(plan: TenantPlan) -> Self {
        Self {
            device_management: true,
            alert_management: true,
            data_export: true,
            api_access: true,
            report_analysis: matches!(plan, TenantPlan::Standard | TenantPlan::Enterprise),
            advanced_features: matches!(plan, TenantPlan::Enterprise),
        }
    }
}

impl Default for TenantFeatures {
    fn default() -> Self {
        Self::for_plan(TenantPlan::Trial)
    }
}

/// An immutable snapshot of how one tenant's traffic is routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRoutingConfig {
    /// The tenant this config belongs to.
    pub tenant_id: TenantId,
    /// How the tenant's data is isolated.
    pub strategy: IsolationStrategy,
    /// Physical database name, when the registry stores one.
    pub database: Option<String>,
    /// Physical schema name, when the registry stores one.
    pub schema: Option<String>,
    /// Resource quotas.
    pub limits: TenantLimits,
    /// Plan feature switches.
    pub features: TenantFeatures,
}

impl TenantRoutingConfig {
    /// Create a config with defaults for everything but the strategy.
    pub fn new(tenant_id: impl Into<TenantId>, strategy: IsolationStrategy) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            strategy,
            database: None,
            schema: None,
            limits: TenantLimits::default(),
            features: TenantFeatures::default(),
        }
    }

    /// Set the physical database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the physical schema name.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the resource quotas.
    pub fn with_limits(mut self, limits: TenantLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the feature switches.
    pub fn with_features(mut self, features: TenantFeatures) -> Self {
        self.features = features;
        self
    }

    /// Build the routing snapshot for a registry record.
    pub fn from_record(record: &TenantRecord) -> Self {
        Self {
            tenant_id: record.tenant_id.clone(),
            strategy: record.isolation,
            database: record.database_name.clone(),
            schema: record.schema_name.clone(),
            limits: record.limits.clone(),
            features: TenantFeatures::for_plan(record.plan),
        }
    }

    /// The schema this tenant's statements run in.
    ///
    /// Falls back to the platform convention `tenant_<id>` when the registry
    /// stores no explicit name.
    pub fn schema_name(&self) -> String {
        match self.schema {
            Some(ref schema) => schema.clone(),
            None => format!("tenant_{}", self.tenant_id),
        }
    }

    /// The database this tenant's dedicated pool connects to.
    ///
    /// Falls back to the platform convention `coldchain_<id>` when the
    /// registry stores no explicit name.
    pub fn database_name(&self) -> String {
        match self.database {
            Some(ref database) => database.clone(),
            None => format!("coldchain_{}", self.tenant_id),
        }
    }

    /// The physical target this tenant routes to, when the strategy has one.
    pub fn physical_target(&self) -> Option<String> {
        match self.strategy {
            IsolationStrategy::DedicatedDatabase => Some(self.database_name()),
            IsolationStrategy::DedicatedSchema => Some(self.schema_name()),
            IsolationStrategy::SharedDiscriminator => None,
        }
    }
}

//! Tenant isolation strategies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a tenant's data is separated from other tenants'.
///
/// Fixed per tenant for its lifetime; changing it requires an explicit
/// migration procedure, not a config edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationStrategy {
    /// Each tenant has their own database, reached through a dedicated pool.
    DedicatedDatabase,
    /// Tenants share a database; each has their own schema.
    DedicatedSchema,
    /// Tenants share tables, separated by a tenant discriminator column.
    SharedDiscriminator,
}

impl IsolationStrategy {
    /// Decode the numeric strategy code stored by the tenant registry.
    ///
    /// 1 = dedicated database, 2 = dedicated schema, 3 = shared
    /// discriminator. Unknown codes fall back to the safest shared strategy.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::DedicatedDatabase,
            2 => Self::DedicatedSchema,
            _ => Self::SharedDiscriminator,
        }
    }

    /// The numeric code stored by the tenant registry.
    pub fn code(&self) -> i32 {
        match self {
            Self::DedicatedDatabase => 1,
            Self::DedicatedSchema => 2,
            Self::SharedDiscriminator => 3,
        }
    }

    /// Parse a strategy name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DEDICATED_DATABASE" | "DATABASE" => Some(Self::DedicatedDatabase),
            "DEDICATED_SCHEMA" | "SCHEMA" => Some(Self::DedicatedSchema),
            "SHARED_DISCRIMINATOR" | "DISCRIMINATOR" => Some(Self::SharedDiscriminator),
            _ => None,
        }
    }

    /// The canonical strategy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DedicatedDatabase => "DEDICATED_DATABASE",
            Self::DedicatedSchema => "DEDICATED_SCHEMA",
            Self::SharedDiscriminator => "SHARED_DISCRIMINATOR",
        }
    }

    /// Check if this is database-level isolation.
    pub fn is_dedicated_database(&self) -> bool {
        matches!(self, Self::DedicatedDatabase)
    }

    /// Check if this is schema-level isolation.
    pub fn is_dedicated_schema(&self) -> bool {
        matches!(self, Self::DedicatedSchema)
    }

    /// Check if this tenant shares tables with others.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::SharedDiscriminator)
    }
}

impl Default for IsolationStrategy {
    fn default() -> Self {
        Self::SharedDiscriminator
    }
}

impl fmt::Display for IsolationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for strategy in [
            IsolationStrategy::DedicatedDatabase,
            IsolationStrategy::DedicatedSchema,
            IsolationStrategy::SharedDiscriminator,
        ] {
            assert_eq!(IsolationStrategy::from_code(strategy.code()), strategy);
        }
    }

    #[test]
    fn test_unknown_code_falls_back_to_shared() {
        assert_eq!(
            IsolationStrategy::from_code(0),
            IsolationStrategy::SharedDiscriminator
        );
        assert_eq!(
            IsolationStrategy::from_code(99),
            IsolationStrategy::SharedDiscriminator
        );
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            IsolationStrategy::from_name("dedicated_schema"),
            Some(IsolationStrategy::DedicatedSchema)
        );
        assert_eq!(
            IsolationStrategy::from_name("DATABASE"),
            Some(IsolationStrategy::DedicatedDatabase)
        );
        assert_eq!(IsolationStrategy::from_name("nonsense"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&IsolationStrategy::DedicatedSchema).unwrap();
        assert_eq!(json, "\"DEDICATED_SCHEMA\"");

        let back: IsolationStrategy = serde_json::from_str("\"SHARED_DISCRIMINATOR\"").unwrap();
        assert_eq!(back, IsolationStrategy::SharedDiscriminator);
    }
}

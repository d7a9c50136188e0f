//! Tenant identification from incoming requests.
//!
//! The routing core does not depend on a web framework, so extraction works
//! on [`RequestParts`], a minimal view of a request that any HTTP layer can
//! fill in. Each [`TenantExtractor`] reads one source; the
//! [`CompositeExtractor`] tries them in priority order and falls back to
//! the platform default tenant.
//!
//! Priority, highest first:
//!
//! 1. authenticated token claim
//! 2. `X-Tenant-Id` header
//! 3. host subdomain (`corp001.coldchain.example`)
//! 4. URL path (`/api/tenant/corp001/...`)
//! 5. default tenant

use std::collections::HashMap;

use serde_json::Value;

use crate::context::TenantId;

/// Header carrying an explicit tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Token claim carrying the authenticated tenant id.
pub const TENANT_CLAIM: &str = "tenantId";

/// Tenant used when no source identifies one.
pub const DEFAULT_TENANT_ID: &str = "corp001";

/// A framework-neutral view of the parts of a request that can name a
/// tenant.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    path: String,
    host: Option<String>,
    headers: HashMap<String, String>,
    claims: Option<Value>,
}

impl RequestParts {
    /// Create parts for a request path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the request host (the `Host` header, port allowed).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Add a header. Names are matched case-insensitively.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Attach verified token claims.
    pub fn with_claims(mut self, claims: Value) -> Self {
        self.claims = Some(claims);
        self
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request host, when known.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// A header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The verified token claims, when present.
    pub fn claims(&self) -> Option<&Value> {
        self.claims.as_ref()
    }
}

/// Source a tenant id was extracted from.
///
/// Sources order by how much the platform trusts them; an authenticated
/// claim always beats anything the client can freely set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantSource {
    /// Authenticated token claim.
    Claim,
    /// `X-Tenant-Id` header.
    Header,
    /// Host subdomain.
    Subdomain,
    /// URL path segment.
    UrlPath,
    /// Configured default tenant.
    Default,
}

impl TenantSource {
    /// Priority of this source (higher wins).
    pub fn priority(&self) -> u8 {
        match self {
            TenantSource::Claim => 5,
            TenantSource::Header => 4,
            TenantSource::Subdomain => 3,
            TenantSource::UrlPath => 2,
            TenantSource::Default => 1,
        }
    }

    /// Whether this is the default fallback.
    pub fn is_default(&self) -> bool {
        matches!(self, TenantSource::Default)
    }
}

impl std::fmt::Display for TenantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantSource::Claim => f.write_str("claim"),
            TenantSource::Header => f.write_str("header"),
            TenantSource::Subdomain => f.write_str("subdomain"),
            TenantSource::UrlPath => f.write_str("url_path"),
            TenantSource::Default => f.write_str("default"),
        }
    }
}

impl Ord for TenantSource {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl PartialOrd for TenantSource {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of resolving a tenant from a request.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    /// The winning tenant id.
    pub tenant_id: TenantId,
    /// Where it came from.
    pub source: TenantSource,
    /// Every source that produced a tenant id, highest priority first.
    pub all_sources: Vec<(TenantSource, TenantId)>,
}

impl ResolvedTenant {
    /// Whether the default fallback was used.
    pub fn is_default(&self) -> bool {
        self.source.is_default()
    }

    /// The tenant id as a string slice.
    pub fn tenant_id_str(&self) -> &str {
        self.tenant_id.as_str()
    }
}

/// Extracts a tenant id from one source.
pub trait TenantExtractor: Send + Sync {
    /// Try to extract a tenant id.
    fn extract(&self, parts: &RequestParts) -> Option<TenantId>;

    /// The source this extractor reads.
    fn source(&self) -> TenantSource;
}

/// Reads the tenant id from the verified token claims.
#[derive(Debug, Default)]
pub struct ClaimExtractor;

impl TenantExtractor for ClaimExtractor {
    fn extract(&self, parts: &RequestParts) -> Option<TenantId> {
        match parts.claims()?.get(TENANT_CLAIM)? {
            Value::String(id) if is_valid_tenant_id(id) => Some(TenantId::new(id.as_str())),
            Value::Number(id) => Some(TenantId::new(id.to_string())),
            _ => None,
        }
    }

    fn source(&self) -> TenantSource {
        TenantSource::Claim
    }
}

/// Reads the tenant id from the `X-Tenant-Id` header.
#[derive(Debug, Default)]
pub struct HeaderExtractor;

impl TenantExtractor for HeaderExtractor {
    fn extract(&self, parts: &RequestParts) -> Option<TenantId> {
        parts
            .header(TENANT_HEADER)
            .filter(|id| is_valid_tenant_id(id))
            .map(TenantId::new)
    }

    fn source(&self) -> TenantSource {
        TenantSource::Header
    }
}

/// Reads the tenant id from the first host label.
///
/// Only fires for hosts with at least three labels, so a bare platform
/// domain never looks like a tenant. The `www` and `api` labels are
/// infrastructure, not tenants.
#[derive(Debug, Default)]
pub struct SubdomainExtractor;

impl TenantExtractor for SubdomainExtractor {
    fn extract(&self, parts: &RequestParts) -> Option<TenantId> {
        let host = parts.host()?;
        let host = host.split(':').next()?;

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 3 {
            return None;
        }

        let first = labels[0];
        if first == "www" || first == "api" || !is_valid_tenant_id(first) {
            return None;
        }
        Some(TenantId::new(first))
    }

    fn source(&self) -> TenantSource {
        TenantSource::Subdomain
    }
}

/// Reads the tenant id from an `/api/tenant/{id}` path.
#[derive(Debug, Default)]
pub struct UrlPathExtractor;

impl TenantExtractor for UrlPathExtractor {
    fn extract(&self, parts: &RequestParts) -> Option<TenantId> {
        let rest = parts.path().strip_prefix("/api/tenant/")?;
        let tenant = rest.split('/').next()?;
        if !is_valid_tenant_id(tenant) {
            return None;
        }
        Some(TenantId::new(tenant))
    }

    fn source(&self) -> TenantSource {
        TenantSource::UrlPath
    }
}

/// Resolves a tenant by trying extractors in priority order.
pub struct CompositeExtractor {
    extractors: Vec<Box<dyn TenantExtractor>>,
    default_tenant: TenantId,
}

impl CompositeExtractor {
    /// Create an empty resolver with a default tenant.
    pub fn new(default_tenant: impl Into<TenantId>) -> Self {
        Self {
            extractors: Vec::new(),
            default_tenant: default_tenant.into(),
        }
    }

    /// Add an extractor. Extractors are tried in insertion order.
    pub fn with(mut self, extractor: impl TenantExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// The platform-standard chain: claim, header, subdomain, URL path,
    /// then the default tenant.
    pub fn standard() -> Self {
        Self::new(DEFAULT_TENANT_ID)
            .with(ClaimExtractor)
            .with(HeaderExtractor)
            .with(SubdomainExtractor)
            .with(UrlPathExtractor)
    }

    /// Resolve the tenant for a request.
    pub fn resolve(&self, parts: &RequestParts) -> ResolvedTenant {
        let mut all_sources = Vec::new();
        for extractor in &self.extractors {
            if let Some(tenant_id) = extractor.extract(parts) {
                all_sources.push((extractor.source(), tenant_id));
            }
        }

        match all_sources.first().cloned() {
            Some((source, tenant_id)) => ResolvedTenant {
                tenant_id,
                source,
                all_sources,
            },
            None => ResolvedTenant {
                tenant_id: self.default_tenant.clone(),
                source: TenantSource::Default,
                all_sources,
            },
        }
    }
}

impl Default for CompositeExtractor {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for CompositeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeExtractor")
            .field("extractors", &self.extractors.len())
            .field("default_tenant", &self.default_tenant)
            .finish()
    }
}

/// Validates a tenant id: alphanumeric plus `-` and `_`, at most 64 bytes.
fn is_valid_tenant_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

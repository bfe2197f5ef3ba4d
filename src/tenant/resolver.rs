//! Request-to-tenant resolution.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use http::{header, HeaderMap, Uri};
use tracing::debug;

use crate::app_state::InitializationGate;
use crate::error::StoreError;

use super::{Tenant, TenantContext};

/// Subdomain labels that never name a real tenant.
pub const DEFAULT_RESERVED_SLUGS: &[&str] = &["www", "admin", "api", "static"];

/// Options for a single resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Resolve even if the service has not completed first-run setup
    pub skip_initialization_check: bool,
}

/// Maps a request to a tenant.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Resolve the tenant addressed by a request, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Fails when the initialization flag cannot be read.
    async fn resolve(
        &self,
        uri: &Uri,
        headers: &HeaderMap,
        options: ResolveOptions,
    ) -> Result<Option<TenantContext>, StoreError>;
}

/// Resolves tenants from the subdomain of the request host.
///
/// `alice.gallery.example` resolves to the tenant with slug `alice`. The bare
/// base domain and reserved labels resolve to a placeholder tenant.
pub struct HostTenantResolver {
    base_domain: String,
    tenants: HashMap<String, Tenant>,
    reserved_slugs: HashSet<String>,
    placeholder: Tenant,
    gate: Option<Arc<InitializationGate>>,
}

impl HostTenantResolver {
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into().trim_matches('.').to_ascii_lowercase(),
            tenants: HashMap::new(),
            reserved_slugs: DEFAULT_RESERVED_SLUGS.iter().map(|s| s.to_string()).collect(),
            placeholder: Tenant::new("placeholder", "", "Placeholder"),
            gate: None,
        }
    }

    /// Register a tenant.
    pub fn with_tenant(mut self, tenant: Tenant) -> Self {
        self.tenants.insert(tenant.slug.to_ascii_lowercase(), tenant);
        self
    }

    /// Replace the reserved subdomain labels.
    pub fn with_reserved_slugs<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_slugs = slugs
            .into_iter()
            .map(|s| s.into().to_ascii_lowercase())
            .collect();
        self
    }

    /// Refuse to resolve tenants until `gate` reports initialized, unless the
    /// caller asks to skip the check.
    pub fn with_initialization_gate(mut self, gate: Arc<InitializationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn resolve_host(&self, host: &str) -> Option<TenantContext> {
        if host == self.base_domain {
            return Some(TenantContext::placeholder(self.placeholder.clone()));
        }

        let slug = host.strip_suffix(&self.base_domain)?.strip_suffix('.')?;
        if slug.is_empty() || slug.contains('.') {
            return None;
        }

        if self.reserved_slugs.contains(slug) {
            let mut tenant = self.placeholder.clone();
            tenant.slug = slug.to_string();
            return Some(TenantContext::placeholder(tenant));
        }

        self.tenants
            .get(slug)
            .map(|tenant| TenantContext::new(tenant.clone()))
    }
}

#[async_trait]
impl TenantResolver for HostTenantResolver {
    async fn resolve(
        &self,
        uri: &Uri,
        headers: &HeaderMap,
        options: ResolveOptions,
    ) -> Result<Option<TenantContext>, StoreError> {
        if !options.skip_initialization_check {
            if let Some(gate) = &self.gate {
                if !gate.is_initialized().await? {
                    return Ok(None);
                }
            }
        }

        let Some(host) = request_host(uri, headers) else {
            return Ok(None);
        };
        let context = self.resolve_host(&host);
        debug!(
            host = %host,
            tenant_id = context.as_ref().map(|c| c.tenant_id()).unwrap_or("-"),
            "Resolved tenant"
        );
        Ok(context)
    }
}

/// Lowercased request host without port, preferring `X-Forwarded-Host`.
fn request_host(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim().to_string())
        .or_else(|| uri.host().map(str::to_string))?;

    let host = match raw.rsplit_once(':') {
        // Leave bracketed IPv6 literals without a port untouched.
        Some((name, port)) if !name.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => raw.as_str(),
    };

    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

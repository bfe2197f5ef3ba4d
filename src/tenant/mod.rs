//! Tenant identity and resolution.
//!
//! Tenant context is resolved once per request by the CORS gate and stored in
//! the request extensions as a [`RequestTenant`]; downstream handlers read it
//! from there instead of looking it up again.

mod resolver;

pub use resolver::{HostTenantResolver, ResolveOptions, TenantResolver, DEFAULT_RESERVED_SLUGS};

use http::Extensions;
use serde::Serialize;

/// An isolated customer site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    /// Opaque tenant identifier, primary key for all per-tenant state
    pub id: String,
    /// Subdomain label
    pub slug: String,
    /// Display name
    pub name: String,
}

impl Tenant {
    pub fn new(id: impl Into<String>, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
        }
    }
}

/// Tenant resolved for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant: Tenant,
    /// Reserved or placeholder tenant (platform root, `www`, `admin`, ...)
    pub is_placeholder: bool,
}

impl TenantContext {
    pub fn new(tenant: Tenant) -> Self {
        Self {
            tenant,
            is_placeholder: false,
        }
    }

    pub fn placeholder(tenant: Tenant) -> Self {
        Self {
            tenant,
            is_placeholder: true,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant.id
    }
}

/// Per-request tenant state attached by the CORS gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTenant {
    /// The service is not initialized yet; tenant resolution was skipped.
    Bootstrap,
    /// A tenant was resolved.
    Resolved(TenantContext),
    /// Resolution ran and found no tenant.
    Missing,
}

impl RequestTenant {
    /// Read the request's tenant state. Requests that bypassed the gate are
    /// treated as having no tenant.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions
            .get::<RequestTenant>()
            .cloned()
            .unwrap_or(RequestTenant::Missing)
    }

    pub fn context(&self) -> Option<&TenantContext> {
        match self {
            RequestTenant::Resolved(context) => Some(context),
            _ => None,
        }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.context().map(TenantContext::tenant_id)
    }
}

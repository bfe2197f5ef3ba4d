//! Configuration management for the gallery gateway.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `GALLERY_` prefix
//! - Defaults that locate build output relative to the working directory
//!
//! # Example
//!
//! ```ignore
//! use gallery_gateway::config::ServeConfig;
//!
//! let config = ServeConfig::parse();
//! config.validate()?;
//!
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `GALLERY_HOST` - Server bind address (default: 0.0.0.0)
//! - `GALLERY_PORT` - Server port (default: 3000)
//! - `GALLERY_BASE_DOMAIN` - Domain whose subdomains name tenants (default: localhost)
//! - `GALLERY_TENANTS` - Comma-separated `slug=Display Name` entries
//! - `GALLERY_RESERVED_SLUGS` - Subdomains that never name a tenant
//! - `GALLERY_DASHBOARD_ROOTS` - Ordered dashboard build directories
//! - `GALLERY_WEB_ROOTS` - Ordered gallery build directories
//! - `GALLERY_TENANTLESS_PATHS` - Dashboard paths served without a tenant
//! - `GALLERY_CORS_ORIGINS` - Initial allowed origins for every tenant
//! - `GALLERY_PHOTO_MANIFESTS` - Comma-separated `slug=path/to/photos.json` entries
//! - `GALLERY_SKIP_INITIALIZATION` - Leave first-run setup pending on startup
//! - `GALLERY_DOCUMENT_CACHE` - Memoized path resolutions per app (default: 512)

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::server::DEFAULT_TENANTLESS_PATHS;
use crate::tenant::{Tenant, DEFAULT_RESERVED_SLUGS};
use crate::web::DEFAULT_RESOLUTION_CACHE_SIZE;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default base domain.
pub const DEFAULT_BASE_DOMAIN: &str = "localhost";

/// Levels above the working directory searched for build output.
const ROOT_SEARCH_DEPTH: usize = 4;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Gallery Gateway - HTTP front door of a multi-tenant photo gallery.
///
/// Serves the dashboard and gallery apps per tenant subdomain, enforces each
/// tenant's CORS policy and renders share pages.
#[derive(Parser, Debug, Clone)]
#[command(name = "gallery-gateway")]
#[command(author, version, about, long_about = None)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    // =========================================================================
    // Tenancy
    // =========================================================================
    /// Domain whose subdomains name tenants (e.g. gallery.example).
    #[arg(long, default_value = DEFAULT_BASE_DOMAIN, env = "GALLERY_BASE_DOMAIN")]
    pub base_domain: String,

    /// Tenant as `slug=Display Name` (repeatable).
    #[arg(long = "tenant", env = "GALLERY_TENANTS", value_delimiter = ',')]
    pub tenants: Vec<String>,

    /// Subdomain that never names a tenant (repeatable).
    #[arg(
        long = "reserved-slug",
        env = "GALLERY_RESERVED_SLUGS",
        value_delimiter = ',',
        default_values_t = DEFAULT_RESERVED_SLUGS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub reserved_slugs: Vec<String>,

    /// Dashboard path served without a tenant (repeatable).
    #[arg(
        long = "tenantless-path",
        env = "GALLERY_TENANTLESS_PATHS",
        value_delimiter = ',',
        default_values_t = DEFAULT_TENANTLESS_PATHS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub tenantless_paths: Vec<String>,

    // =========================================================================
    // Documents
    // =========================================================================
    /// Dashboard build directory, probed in the given order (repeatable).
    ///
    /// Defaults to `dist/static/dashboard`, `static/dashboard` and
    /// `apps/dashboard/dist` under the working directory and its parents.
    #[arg(long = "dashboard-root", env = "GALLERY_DASHBOARD_ROOTS", value_delimiter = ',')]
    pub dashboard_roots: Vec<PathBuf>,

    /// Gallery build directory, probed in the given order (repeatable).
    ///
    /// Defaults to `dist/static/web`, `static/web` and `apps/web/dist` under
    /// the working directory and its parents.
    #[arg(long = "web-root", env = "GALLERY_WEB_ROOTS", value_delimiter = ',')]
    pub web_roots: Vec<PathBuf>,

    /// Memoized path resolutions per app.
    #[arg(long, default_value_t = DEFAULT_RESOLUTION_CACHE_SIZE, env = "GALLERY_DOCUMENT_CACHE")]
    pub document_cache: usize,

    /// Photo manifest as `slug=path/to/photos.json` (repeatable).
    #[arg(long = "photo-manifest", env = "GALLERY_PHOTO_MANIFESTS", value_delimiter = ',')]
    pub photo_manifests: Vec<String>,

    // =========================================================================
    // CORS and setup
    // =========================================================================
    /// Initial allowed origins (newline or comma separated) for every tenant.
    ///
    /// If not specified, tenants accept any origin until configured.
    #[arg(long, env = "GALLERY_CORS_ORIGINS")]
    pub cors_origins: Option<String>,

    /// Leave first-run setup pending on startup.
    ///
    /// CORS stays permissive and tenants are not resolved until another
    /// process marks the application initialized.
    #[arg(long, default_value_t = false, env = "GALLERY_SKIP_INITIALIZATION")]
    pub skip_initialization: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let base = self.base_domain.trim_matches('.');
        if base.is_empty() {
            return Err("Base domain is required. Set --base-domain or GALLERY_BASE_DOMAIN".into());
        }
        if base.contains(['/', ':']) {
            return Err(format!(
                "Base domain must be a bare host name, got '{}'",
                self.base_domain
            ));
        }

        let tenants = self.parsed_tenants()?;
        for tenant in &tenants {
            if self
                .reserved_slugs
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(&tenant.slug))
            {
                return Err(format!("Tenant slug '{}' is reserved", tenant.slug));
            }
        }

        for (slug, _) in self.parsed_photo_manifests()? {
            if !tenants.iter().any(|tenant| tenant.slug == slug) {
                return Err(format!("Photo manifest refers to unknown tenant '{}'", slug));
            }
        }

        if let Some(path) = self.tenantless_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(format!("Tenant-less path must start with '/', got '{}'", path));
        }

        if self.document_cache == 0 {
            return Err("document_cache must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the `--tenant` entries. The slug doubles as tenant id.
    pub fn parsed_tenants(&self) -> Result<Vec<Tenant>, String> {
        let mut tenants: Vec<Tenant> = Vec::new();

        for entry in &self.tenants {
            let (slug, name) = match entry.split_once('=') {
                Some((slug, name)) => (slug.trim(), name.trim()),
                None => (entry.trim(), entry.trim()),
            };

            if slug.is_empty() || !is_valid_slug(slug) {
                return Err(format!("Invalid tenant slug in '{}'", entry));
            }
            let slug = slug.to_ascii_lowercase();
            if tenants.iter().any(|t| t.slug == slug) {
                return Err(format!("Duplicate tenant slug '{}'", slug));
            }

            let name = if name.is_empty() { slug.as_str() } else { name };
            tenants.push(Tenant::new(slug.clone(), slug.clone(), name));
        }

        Ok(tenants)
    }

    /// Parse the `--photo-manifest` entries into (slug, path) pairs.
    pub fn parsed_photo_manifests(&self) -> Result<Vec<(String, PathBuf)>, String> {
        self.photo_manifests
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((slug, path)) if !slug.trim().is_empty() && !path.trim().is_empty() => Ok((
                    slug.trim().to_ascii_lowercase(),
                    PathBuf::from(path.trim()),
                )),
                _ => Err(format!(
                    "Invalid photo manifest '{}', expected slug=path",
                    entry
                )),
            })
            .collect()
    }

    /// Dashboard candidate roots, deduplicated in order.
    pub fn dashboard_candidates(&self, cwd: &Path) -> Vec<PathBuf> {
        candidate_roots(&self.dashboard_roots, cwd, "dashboard")
    }

    /// Gallery candidate roots, deduplicated in order.
    pub fn web_candidates(&self, cwd: &Path) -> Vec<PathBuf> {
        candidate_roots(&self.web_roots, cwd, "web")
    }
}

fn is_valid_slug(slug: &str) -> bool {
    slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
}

/// Explicit roots, or the default build-output layout for `app`.
///
/// Relative explicit roots are resolved against `cwd`.
pub fn candidate_roots(explicit: &[PathBuf], cwd: &Path, app: &str) -> Vec<PathBuf> {
    let candidates: Vec<PathBuf> = if explicit.is_empty() {
        let layouts: [&[&str]; 3] = [
            &["dist", "static", app],
            &["static", app],
            &["apps", app, "dist"],
        ];
        layouts
            .iter()
            .flat_map(|layout| {
                cwd.ancestors()
                    .take(ROOT_SEARCH_DEPTH)
                    .map(move |base| layout.iter().fold(base.to_path_buf(), |p, s| p.join(s)))
            })
            .collect()
    } else {
        explicit.iter().map(|root| cwd.join(root)).collect()
    };

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

// =============================================================================
// Tests
// =============================================================================

//! Static document resolution across ordered candidate roots.
//!
//! ```text
//! "/gallery/app.js" ──► sanitize ──► memo hit? ──yes──► /B/gallery/app.js
//!                                       │
//!                                       no
//!                                       ▼
//!                         probe A ──► probe B (found, stop) ──► memoize
//! ```
//!
//! The first root containing the requested file wins. Later roots are not
//! probed once a match is found.

use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use lru::LruCache;
use tokio::sync::Mutex;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::tenant::RequestTenant;

use super::fallback::FallbackPage;

/// Default number of memoized path resolutions.
pub const DEFAULT_RESOLUTION_CACHE_SIZE: usize = 512;

/// Entry document of single-page apps.
pub const INDEX_DOCUMENT: &str = "index.html";

// =============================================================================
// Routing helpers
// =============================================================================

/// Whether `path` addresses an HTML document rather than an asset.
///
/// A path is a document route when its last segment has no extension or the
/// extension is `.html`.
pub fn is_html_route(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match Path::new(last).extension() {
        None => true,
        Some(ext) => ext.eq_ignore_ascii_case("html"),
    }
}

/// Turn a request path into a relative path that cannot escape a root.
///
/// Percent-encoding is decoded first. Returns `None` for `..` segments,
/// backslashes, NUL bytes or anything else that is not a plain file name.
pub fn sanitize_relative(path: &str) -> Option<String> {
    let decoded = urlencoding::decode(path).ok()?;

    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => segments.push(s),
        }
    }

    let relative = segments.join("/");
    let normal = Path::new(&relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));

    normal.then_some(relative)
}

/// Outcome of the tenant check on a document route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAccess {
    Serve,
    Fallback(FallbackPage),
}

/// Decide whether a document route may be served for this tenant.
///
/// - Before initialization every document is served.
/// - Reserved subdomains get the restricted page.
/// - Without a tenant (or on the bare platform domain) only tenant-less
///   paths are served; everything else gets the missing page.
pub fn document_access(tenant: &RequestTenant, tenantless_allowed: bool) -> DocumentAccess {
    let has_tenant = match tenant {
        RequestTenant::Bootstrap => return DocumentAccess::Serve,
        RequestTenant::Resolved(context) if context.is_placeholder => {
            if !context.tenant.slug.is_empty() {
                return DocumentAccess::Fallback(FallbackPage::TenantRestricted);
            }
            false
        }
        RequestTenant::Resolved(_) => true,
        RequestTenant::Missing => false,
    };

    if has_tenant || tenantless_allowed {
        DocumentAccess::Serve
    } else {
        DocumentAccess::Fallback(FallbackPage::TenantMissing)
    }
}

/// Force permissive CORS on a static asset response.
///
/// Assets are embeddable from any origin regardless of tenant policy, so
/// credentials are never advertised for them.
pub fn apply_static_asset_cors(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.remove(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
}

// =============================================================================
// Document server
// =============================================================================

/// Serves files from an ordered list of candidate roots.
pub struct StaticDocumentServer {
    name: &'static str,
    roots: Vec<PathBuf>,
    resolved: Mutex<LruCache<String, PathBuf>>,
}

impl StaticDocumentServer {
    /// Create a server over `roots`, probed in order. Duplicate roots are
    /// dropped, keeping the first occurrence.
    pub fn new(name: &'static str, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !unique.contains(&root) {
                unique.push(root);
            }
        }

        Self {
            name,
            roots: unique,
            resolved: Mutex::new(LruCache::new(cache_capacity(
                DEFAULT_RESOLUTION_CACHE_SIZE,
            ))),
        }
    }

    /// Set the number of memoized resolutions.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.resolved = Mutex::new(LruCache::new(cache_capacity(capacity)));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find the first root containing `relative` as a regular file.
    pub async fn resolve(&self, relative: &str) -> Option<PathBuf> {
        if let Some(path) = self.resolved.lock().await.get(relative) {
            return Some(path.clone());
        }

        for root in &self.roots {
            let candidate = root.join(relative);
            match tokio::fs::metadata(&candidate).await {
                Ok(metadata) if metadata.is_file() => {
                    debug!(
                        server = self.name,
                        path = relative,
                        root = %root.display(),
                        "Resolved static file"
                    );
                    self.resolved
                        .lock()
                        .await
                        .put(relative.to_string(), candidate.clone());
                    return Some(candidate);
                }
                _ => continue,
            }
        }

        None
    }

    /// Read a document as text, re-probing once if a memoized file vanished.
    pub async fn read_document(&self, relative: &str) -> Result<String, GatewayError> {
        for _ in 0..2 {
            let Some(path) = self.resolve(relative).await else {
                break;
            };

            match tokio::fs::read_to_string(&path).await {
                Ok(content) => return Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    self.resolved.lock().await.pop(relative);
                }
                Err(e) => {
                    return Err(GatewayError::Document {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }

        Err(GatewayError::NotFound(relative.to_string()))
    }

    /// Serve a single HTML document.
    pub async fn serve_document(&self, relative: &str) -> Result<Response, GatewayError> {
        let content = self.read_document(relative).await?;
        Ok(Html(content).into_response())
    }

    /// Serve an app route: an existing `.html` file, else the app's
    /// `index.html`.
    pub async fn serve_app_document(&self, relative: &str) -> Result<Response, GatewayError> {
        if relative.to_ascii_lowercase().ends_with(".html") {
            match self.serve_document(relative).await {
                Err(GatewayError::NotFound(_)) => {}
                other => return other,
            }
        }
        self.serve_document(INDEX_DOCUMENT).await
    }

    /// Serve a static asset with permissive CORS.
    ///
    /// Missing assets yield a 404 that also carries the permissive headers.
    pub async fn serve_asset(&self, relative: &str, request: Request) -> Response {
        let mut response = match self.resolve(relative).await {
            Some(path) => match ServeFile::new(path).oneshot(request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            },
            None => GatewayError::NotFound(relative.to_string()).into_response(),
        };

        apply_static_asset_cors(&mut response);
        response
    }

    /// Render a fallback page, preferring a copy shipped in the roots.
    pub async fn fallback_page(&self, page: FallbackPage, host: Option<&str>) -> Response {
        let content = match self.read_document(page.file_name()).await {
            Ok(content) => content,
            Err(GatewayError::NotFound(_)) => page.render(host),
            Err(e) => {
                warn!(
                    server = self.name,
                    error = %e,
                    "Failed to read custom fallback page, using built-in"
                );
                page.render(host)
            }
        };

        (page.status(), Html(content)).into_response()
    }
}

fn cache_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

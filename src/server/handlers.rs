//! HTTP request handlers for the gallery gateway.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /platform/...` - Dashboard documents and assets
//! - `GET /share/{photo_ids}`, `GET /share?id=...` - Share documents
//! - `GET /...` - Gallery documents and assets

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::app_state::InitializationGate;
use crate::error::{GatewayError, StoreError};
use crate::tenant::RequestTenant;
use crate::web::{
    document_access, is_html_route, sanitize_relative, DocumentAccess, ShareDocumentComposer,
    StaticDocumentServer,
};

/// Path prefix of the dashboard app.
pub const DASHBOARD_BASENAME: &str = "/platform";

/// Template document of share pages, looked up in the web roots.
pub const SHARE_TEMPLATE: &str = "share.html";

/// Dashboard pages reachable without a tenant.
pub const DEFAULT_TENANTLESS_PATHS: &[&str] =
    &["/platform/welcome", "/platform/login", "/platform/register"];

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState {
    /// Dashboard app documents and assets
    pub dashboard: Arc<StaticDocumentServer>,

    /// Gallery app documents and assets (also holds the share template)
    pub web: Arc<StaticDocumentServer>,

    /// Share page composer
    pub share: Arc<ShareDocumentComposer>,

    /// First-run state, reported by the health check
    pub gate: Arc<InitializationGate>,

    /// Dashboard HTML paths served without a tenant
    pub tenantless_paths: Arc<[String]>,
}

impl AppState {
    pub fn new(
        dashboard: StaticDocumentServer,
        web: StaticDocumentServer,
        share: ShareDocumentComposer,
        gate: Arc<InitializationGate>,
    ) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
            web: Arc::new(web),
            share: Arc::new(share),
            gate,
            tenantless_paths: DEFAULT_TENANTLESS_PATHS
                .iter()
                .map(|path| path.to_string())
                .collect(),
        }
    }

    /// Replace the tenant-less dashboard paths.
    pub fn with_tenantless_paths(mut self, paths: Vec<String>) -> Self {
        self.tenantless_paths = paths.into();
        self
    }

    /// Whether `path` (or a page below it) may be served without a tenant.
    pub fn allows_tenantless(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        self.tenantless_paths.iter().any(|allowed| {
            let allowed = allowed.trim_end_matches('/');
            path == allowed
                || path
                    .strip_prefix(allowed)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            dashboard: Arc::clone(&self.dashboard),
            web: Arc::clone(&self.web),
            share: Arc::clone(&self.share),
            gate: Arc::clone(&self.gate),
            tenantless_paths: Arc::clone(&self.tenantless_paths),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for `GET /share`.
#[derive(Debug, Deserialize)]
pub struct ShareQueryParams {
    /// Comma-separated photo identifiers
    #[serde(default)]
    pub id: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "store_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Whether first-run setup has completed
    pub initialized: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert GatewayError to HTTP response.
///
/// 5xx errors are logged at ERROR level, 404s at DEBUG.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            GatewayError::Store(store_err) => {
                let error_type = match store_err {
                    StoreError::Unavailable(_) => "store_unavailable",
                    StoreError::InvalidValue { .. } => "invalid_setting",
                    StoreError::WriteFailed { .. } => "store_write_failed",
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_type,
                    store_err.to_string(),
                )
            }

            GatewayError::Document { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "document_error",
                self.to_string(),
            ),

            GatewayError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Resource not found: {}", path),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "initialized": true
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, GatewayError> {
    let initialized = state.gate.is_initialized().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        initialized,
    }))
}

/// Handle dashboard requests.
///
/// # Endpoint
///
/// `GET /platform`, `GET /platform/{*path}`
///
/// HTML routes serve the dashboard app (falling back to its `index.html`)
/// unless the tenant check selects a fallback page. Other paths are assets.
pub async fn dashboard_handler(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let relative = path.strip_prefix(DASHBOARD_BASENAME).unwrap_or(&path);
    let tenantless = state.allows_tenantless(&path);

    serve_static(&state.dashboard, &path, relative, tenantless, request).await
}

/// Handle gallery requests (router fallback).
///
/// # Endpoint
///
/// `GET /{*path}`
pub async fn web_handler(State(state): State<AppState>, request: Request) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let path = request.uri().path().to_string();
    serve_static(&state.web, &path, &path, false, request).await
}

/// Handle share requests with ids in the path.
///
/// # Endpoint
///
/// `GET /share/{photo_ids}`
///
/// # Response
///
/// - `200 OK`: share document with embedded photo data
/// - `400 Bad Request`: no photo ids given (template unchanged)
/// - `404 Not Found`: no photo matched (template unchanged)
pub async fn share_handler(
    State(state): State<AppState>,
    Path(photo_ids): Path<String>,
    request: Request,
) -> Response {
    share_document(&state, &photo_ids, request).await
}

/// Handle share requests with ids in the query.
///
/// # Endpoint
///
/// `GET /share?id={photo_ids}`
pub async fn share_query_handler(
    State(state): State<AppState>,
    Query(query): Query<ShareQueryParams>,
    request: Request,
) -> Response {
    let photo_ids = query.id.unwrap_or_default();
    share_document(&state, &photo_ids, request).await
}

async fn share_document(state: &AppState, photo_ids: &str, request: Request) -> Response {
    let tenant = RequestTenant::from_extensions(request.extensions());

    if let DocumentAccess::Fallback(page) = document_access(&tenant, false) {
        let host = request_host(&request);
        return state.web.fallback_page(page, host.as_deref()).await;
    }

    let template = match state.web.serve_document(SHARE_TEMPLATE).await {
        Ok(response) => response,
        Err(e) => return e.into_response(),
    };

    let mut response = state
        .share
        .compose(photo_ids, tenant.context(), template)
        .await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Serve a document or asset from `server`.
async fn serve_static(
    server: &StaticDocumentServer,
    path: &str,
    relative: &str,
    tenantless: bool,
    request: Request,
) -> Response {
    let Some(relative) = sanitize_relative(relative) else {
        warn!(server = server.name(), path, "Rejected static path");
        return GatewayError::NotFound(path.to_string()).into_response();
    };

    if !is_html_route(path) {
        return server.serve_asset(&relative, request).await;
    }

    let tenant = RequestTenant::from_extensions(request.extensions());
    match document_access(&tenant, tenantless) {
        DocumentAccess::Fallback(page) => {
            debug!(
                server = server.name(),
                path,
                tenant_id = tenant.tenant_id().unwrap_or("-"),
                page = page.file_name(),
                "Serving tenant fallback page"
            );
            let host = request_host(&request);
            server.fallback_page(page, host.as_deref()).await
        }
        DocumentAccess::Serve => server.serve_app_document(&relative).await.into_response(),
    }
}

fn request_host(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

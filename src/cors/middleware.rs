//! Request-level CORS gate.
//!
//! ```text
//! request ──► initialized? ──no──► OPTIONS? ──yes──► 204 preflight (echo origin or *)
//!                  │                   └──no───► handler + permissive headers
//!                  yes
//!                  ▼
//!          resolve tenant ──► load policy on miss ──► resolve origin
//!                  │
//!                  ├── OPTIONS ──► 204 preflight (allow-origin only if allowed)
//!                  └── other   ──► handler + enforced headers
//! ```
//!
//! Once the service is initialized there is no bypass: every request goes
//! through tenant resolution and policy enforcement.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::app_state::InitializationGate;
use crate::error::GatewayError;
use crate::tenant::{RequestTenant, ResolveOptions, TenantResolver};

use super::cache::CorsPolicyCache;

/// Methods advertised on preflight and bootstrap responses.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Request headers allowed on bootstrap (pre-initialization) responses.
pub const BOOTSTRAP_ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Shared state for [`cors_middleware`].
#[derive(Clone)]
pub struct CorsGate {
    pub gate: Arc<InitializationGate>,
    pub resolver: Arc<dyn TenantResolver>,
    pub policies: Arc<CorsPolicyCache>,
}

impl CorsGate {
    pub fn new(
        gate: Arc<InitializationGate>,
        resolver: Arc<dyn TenantResolver>,
        policies: Arc<CorsPolicyCache>,
    ) -> Self {
        Self {
            gate,
            resolver,
            policies,
        }
    }
}

/// Axum middleware applying the gate to every request.
///
/// Also attaches a [`RequestTenant`] to the request extensions for
/// downstream handlers.
///
/// # Errors
///
/// Fails with [`GatewayError::Store`] when the initialization flag cannot be
/// read; the request is never treated as pre-initialization in that case.
pub async fn cors_middleware(
    State(cors): State<CorsGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let origin = request.headers().get(header::ORIGIN).cloned();

    if !cors.gate.is_initialized().await? {
        debug!(
            path = request.uri().path(),
            "Application not initialized yet, skipping tenant CORS"
        );

        let allow_origin = origin.unwrap_or_else(|| HeaderValue::from_static("*"));
        if request.method() == Method::OPTIONS {
            return Ok(preflight_response(
                request.headers(),
                Some(allow_origin),
                false,
            ));
        }

        request.extensions_mut().insert(RequestTenant::Bootstrap);
        let mut response = next.run(request).await;
        apply_bootstrap_headers(response.headers_mut(), allow_origin);
        return Ok(response);
    }

    let tenant = cors
        .resolver
        .resolve(
            request.uri(),
            request.headers(),
            ResolveOptions {
                skip_initialization_check: true,
            },
        )
        .await?;

    match &tenant {
        Some(context) => cors.policies.ensure_loaded(context.tenant_id()).await,
        None => warn!(
            method = %request.method(),
            path = request.uri().path(),
            "Tenant context missing for request"
        ),
    }

    let allowed = cors.policies.resolve_origin(
        origin.as_ref().and_then(|value| value.to_str().ok()),
        tenant.as_ref(),
    );
    let allow_origin = allowed.and_then(|value| HeaderValue::from_str(&value).ok());

    if request.method() == Method::OPTIONS {
        let mut response = preflight_response(request.headers(), allow_origin, true);
        ensure_vary(response.headers_mut(), "Origin");
        return Ok(response);
    }

    request.extensions_mut().insert(match tenant {
        Some(context) => RequestTenant::Resolved(context),
        None => RequestTenant::Missing,
    });

    let mut response = next.run(request).await;
    apply_enforced_headers(response.headers_mut(), allow_origin);
    Ok(response)
}

/// Build a `204 No Content` preflight response.
///
/// `allow_origin` is the `Access-Control-Allow-Origin` value, or `None` to
/// deny. With `credentials_only_when_allowed` set, the credentials header is
/// omitted on denial; otherwise it is always sent.
pub fn preflight_response(
    request_headers: &HeaderMap,
    allow_origin: Option<HeaderValue>,
    credentials_only_when_allowed: bool,
) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();

    if request_headers.contains_key(header::ORIGIN) {
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }

    if let Some(requested) = request_headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        headers.append(
            header::VARY,
            HeaderValue::from_static("Access-Control-Request-Headers"),
        );
    }

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );

    let allowed = allow_origin.is_some();
    if let Some(origin) = allow_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    if allowed || !credentials_only_when_allowed {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_TYPE);
    response
}

/// Permissive headers for pre-initialization traffic.
///
/// Handlers that already set `Access-Control-Allow-Origin` keep their own
/// CORS headers.
fn apply_bootstrap_headers(headers: &mut HeaderMap, allow_origin: HeaderValue) {
    if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        return;
    }

    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(BOOTSTRAP_ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}

/// Tenant-enforced headers for a non-preflight response.
fn apply_enforced_headers(headers: &mut HeaderMap, allow_origin: Option<HeaderValue>) {
    ensure_vary(headers, "Origin");

    if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        return;
    }

    if let Some(origin) = allow_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
}

/// Append `value` to `Vary` unless already listed.
fn ensure_vary(headers: &mut HeaderMap, value: &'static str) {
    let present = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|existing| existing.to_str().ok())
        .flat_map(|existing| existing.split(','))
        .any(|existing| existing.trim().eq_ignore_ascii_case(value));

    if !present {
        headers.append(header::VARY, HeaderValue::from_static(value));
    }
}

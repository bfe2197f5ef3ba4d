//! Router configuration for the gallery gateway.
//!
//! This module defines the HTTP routes and wraps them in the CORS gate.
//!
//! # Route Structure
//!
//! ```text
//! /health                    - Health check
//! /share/{photo_ids}         - Share document (ids in path)
//! /share?id={photo_ids}      - Share document (ids in query)
//! /platform, /platform/...   - Dashboard documents and assets
//! /...                       - Gallery documents and assets (fallback)
//! ```
//!
//! Every route, the fallback included, runs behind [`cors_middleware`], so
//! preflight requests are answered before route dispatch.
//!
//! # Example
//!
//! ```ignore
//! use gallery_gateway::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(dashboard, web, composer, gate.clone());
//! let cors = CorsGate::new(gate, resolver, policies);
//!
//! let router = create_router(state, cors, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{
    dashboard_handler, health_handler, share_handler, share_query_handler, web_handler, AppState,
    DEFAULT_TENANTLESS_PATHS,
};
use crate::cors::{cors_middleware, CorsGate};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Dashboard HTML paths served without a tenant
    pub tenantless_paths: Vec<String>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with default tenant-less paths and
    /// tracing enabled.
    pub fn new() -> Self {
        Self {
            tenantless_paths: DEFAULT_TENANTLESS_PATHS
                .iter()
                .map(|path| path.to_string())
                .collect(),
            enable_tracing: true,
        }
    }

    /// Set the dashboard paths served without a tenant.
    pub fn with_tenantless_paths(mut self, paths: Vec<String>) -> Self {
        self.tenantless_paths = paths;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `state` - Document servers, share composer and initialization gate
/// * `cors` - State of the CORS gate wrapping every route
/// * `config` - Router configuration
pub fn create_router(state: AppState, cors: CorsGate, config: RouterConfig) -> Router {
    let state = state.with_tenantless_paths(config.tenantless_paths);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/share", get(share_query_handler))
        .route("/share/", get(share_query_handler))
        .route("/share/{photo_ids}", get(share_handler))
        .route("/platform", get(dashboard_handler))
        .route("/platform/", get(dashboard_handler))
        .route("/platform/{*path}", get(dashboard_handler))
        .fallback(web_handler)
        .with_state(state)
        .layer(middleware::from_fn_with_state(cors, cors_middleware));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

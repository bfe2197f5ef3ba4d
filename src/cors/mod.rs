//! Per-tenant CORS enforcement.
//!
//! - [`origin`] - origin normalization and allowed-origin policies
//! - [`cache`] - tenant → policy cache with setting-change invalidation
//! - [`middleware`] - the request gate applied to every route

pub mod cache;
pub mod middleware;
pub mod origin;

pub use cache::{CorsPolicyCache, CorsSubscriptions};
pub use middleware::{
    cors_middleware, preflight_response, CorsGate, ALLOWED_METHODS, BOOTSTRAP_ALLOWED_HEADERS,
};
pub use origin::{normalize_origin, AllowedOrigins, CORS_ALLOWED_ORIGINS_KEY};

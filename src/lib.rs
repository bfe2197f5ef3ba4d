//! # Gallery Gateway
//!
//! The HTTP front door of a multi-tenant photo gallery.
//!
//! The gateway resolves the tenant of every request from its subdomain,
//! enforces that tenant's CORS policy, serves the dashboard and gallery apps
//! from their build output and renders share pages with the shared photos
//! embedded in the document.
//!
//! ## Features
//!
//! - **First-run gating**: until setup completes, CORS is permissive and
//!   tenant resolution is skipped
//! - **Per-tenant CORS**: allowed origins are loaded on demand and follow
//!   setting changes through an event bus
//! - **Ordered document roots**: the first build directory containing a file
//!   wins, with memoized resolution
//! - **Share pages**: photo data and site configuration injected into a
//!   freshly parsed copy of the template on every request
//!
//! ## Architecture
//!
//! - [`settings`] - setting stores and change notifications
//! - [`app_state`] - first-run initialization state
//! - [`tenant`] - tenant identity and host-based resolution
//! - [`cors`] - origin policies, policy cache and the CORS gate
//! - [`web`] - static documents, fallback pages and share composition
//! - [`server`] - Axum handlers and router
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gallery_gateway::{
//!     create_router, AppState, CorsGate, CorsPolicyCache, HostTenantResolver,
//!     InitializationGate, MemoryPhotoStore, MemorySettingStore, MemorySiteConfig, RouterConfig,
//!     SettingEventBus, ShareDocumentComposer, StaticDocumentServer, Tenant,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let events = Arc::new(SettingEventBus::new());
//!     let settings = Arc::new(MemorySettingStore::new().with_events(events.clone()));
//!     let gate = Arc::new(InitializationGate::new(settings.clone()));
//!     let policies = Arc::new(CorsPolicyCache::new(settings));
//!     let _subscriptions = policies.start(&events);
//!
//!     let resolver = HostTenantResolver::new("gallery.example")
//!         .with_tenant(Tenant::new("t-alice", "alice", "Alice"));
//!
//!     let state = AppState::new(
//!         StaticDocumentServer::new("dashboard", vec!["dist/static/dashboard".into()]),
//!         StaticDocumentServer::new("web", vec!["dist/static/web".into()]),
//!         ShareDocumentComposer::new(
//!             Arc::new(MemoryPhotoStore::new()),
//!             Arc::new(MemorySiteConfig::new()),
//!         ),
//!         gate.clone(),
//!     );
//!     let cors = CorsGate::new(gate, Arc::new(resolver), policies);
//!     let router = create_router(state, cors, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod app_state;
pub mod config;
pub mod cors;
pub mod error;
pub mod server;
pub mod settings;
pub mod tenant;
pub mod web;

// Re-export commonly used types
pub use app_state::{ensure_initialized, Bootstrap, InitializationGate, APP_INITIALIZED_KEY};
pub use config::ServeConfig;
pub use cors::{
    cors_middleware, normalize_origin, AllowedOrigins, CorsGate, CorsPolicyCache,
    CorsSubscriptions, CORS_ALLOWED_ORIGINS_KEY,
};
pub use error::{ComposeError, GatewayError, StoreError};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use settings::{
    MemorySettingStore, SettingChange, SettingEventBus, SettingEventKind, SettingHandler,
    SystemSettingStore, TenantSettingStore,
};
pub use tenant::{
    HostTenantResolver, RequestTenant, ResolveOptions, Tenant, TenantContext, TenantResolver,
};
pub use web::{
    DocumentTransform, FallbackPage, MemoryPhotoStore, MemorySiteConfig, PhotoRecord, PhotoStore,
    ShareDocumentComposer, SiteConfigProvider, StaticDocumentServer,
};

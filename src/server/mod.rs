//! HTTP server layer for the gallery gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        /platform/...   /share/{ids}   /...   /health            │
//! │                                                                 │
//! │  ┌──────────────────┐  ┌─────────────┐  ┌───────────────────┐   │
//! │  │    CORS gate     │  │  handlers   │  │      routes       │   │
//! │  │ (init + tenant)  │  │ (documents) │  │  (router config)  │   │
//! │  └──────────────────┘  └─────────────┘  └───────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    dashboard_handler, health_handler, share_handler, share_query_handler, web_handler, AppState,
    ErrorResponse, HealthResponse, ShareQueryParams, DASHBOARD_BASENAME, DEFAULT_TENANTLESS_PATHS,
    SHARE_TEMPLATE,
};
pub use routes::{create_router, RouterConfig};

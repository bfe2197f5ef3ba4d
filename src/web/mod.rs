//! Tenant-branded documents and static assets.
//!
//! - [`documents`] - ordered-root file resolution, asset CORS, tenant checks
//! - [`fallback`] - built-in tenant restricted / missing pages
//! - [`share`] - per-request share document composition
//! - [`photos`] - photo and site-configuration collaborators

pub mod documents;
pub mod fallback;
pub mod photos;
pub mod share;

pub use documents::{
    apply_static_asset_cors, document_access, is_html_route, sanitize_relative, DocumentAccess,
    StaticDocumentServer, DEFAULT_RESOLUTION_CACHE_SIZE, INDEX_DOCUMENT,
};
pub use fallback::FallbackPage;
pub use photos::{
    MemoryPhotoStore, MemorySiteConfig, PhotoRecord, PhotoStore, SiteConfigProvider,
};
pub use share::{
    parse_photo_ids, script_json, transform_html, DocumentTransform, ScriptInjection,
    ShareDocumentComposer, CONFIG_SCRIPT_SELECTOR, MANIFEST_SCRIPT_SELECTOR,
};

//! Per-request share document composition.
//!
//! ```text
//! share.html ──► parse ids ──► 400 (none) / 404 (no photos)
//!                    │
//!                    ▼
//!        fetch photos + site config ──► parse tree ──► fill #config, #manifest
//!                                                         │
//!                         original markup ◄── error ──────┤
//!                                                         ▼
//!                                            serialize, Content-Length, 200
//! ```
//!
//! Every request parses its own copy of the template, so concurrent requests
//! never see each other's data.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, response::Parts, HeaderValue, StatusCode},
    response::Response,
};
use kuchikiki::traits::*;
use kuchikiki::NodeRef;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::ComposeError;
use crate::tenant::TenantContext;

use super::photos::{PhotoRecord, PhotoStore, SiteConfigProvider};

/// Selector of the script receiving feature flags and site configuration.
pub const CONFIG_SCRIPT_SELECTOR: &str = "head script#config";

/// Selector of the script receiving the shared photo data.
pub const MANIFEST_SCRIPT_SELECTOR: &str = "head script#manifest";

// =============================================================================
// Document transforms
// =============================================================================

/// A mutation applied to a freshly parsed document tree.
pub trait DocumentTransform: Send + Sync {
    fn apply(&self, document: &NodeRef) -> Result<(), ComposeError>;
}

/// Parse `html`, apply `transform` and serialize the result.
pub fn transform_html(
    html: &str,
    transform: &dyn DocumentTransform,
) -> Result<String, ComposeError> {
    let document = kuchikiki::parse_html().one(html);
    if document.select_first("html").is_err() {
        return Err(ComposeError::Parse("document has no <html> element".into()));
    }

    transform.apply(&document)?;

    let mut out = Vec::with_capacity(html.len());
    document
        .serialize(&mut out)
        .map_err(|e| ComposeError::Serialize(e.to_string()))?;
    String::from_utf8(out).map_err(|e| ComposeError::Serialize(e.to_string()))
}

/// Replace the text of every script matching a selector.
pub struct ScriptInjection {
    scripts: Vec<(&'static str, String)>,
}

impl ScriptInjection {
    pub fn new() -> Self {
        Self {
            scripts: Vec::new(),
        }
    }

    pub fn with_script(mut self, selector: &'static str, text: String) -> Self {
        self.scripts.push((selector, text));
        self
    }
}

impl Default for ScriptInjection {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTransform for ScriptInjection {
    fn apply(&self, document: &NodeRef) -> Result<(), ComposeError> {
        for (selector, text) in &self.scripts {
            let Ok(script) = document.select_first(selector) else {
                debug!(selector = *selector, "Share placeholder not found, skipping");
                continue;
            };

            let node = script.as_node();
            for child in node.children().collect::<Vec<_>>() {
                child.detach();
            }
            node.append(NodeRef::new_text(text.as_str()));
        }
        Ok(())
    }
}

/// Serialize `value` as JSON that is safe inside a `<script>` element.
pub fn script_json<T: Serialize + ?Sized>(
    payload: &'static str,
    value: &T,
) -> Result<String, ComposeError> {
    let json =
        serde_json::to_string(value).map_err(|source| ComposeError::Payload { payload, source })?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }
    Ok(escaped)
}

/// Split a comma-separated id list, trimming and dropping empty entries.
pub fn parse_photo_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Composer
// =============================================================================

/// Embeds photo data into share documents.
pub struct ShareDocumentComposer {
    photos: Arc<dyn PhotoStore>,
    site: Arc<dyn SiteConfigProvider>,
}

impl ShareDocumentComposer {
    pub fn new(photos: Arc<dyn PhotoStore>, site: Arc<dyn SiteConfigProvider>) -> Self {
        Self { photos, site }
    }

    /// Compose the share document for `photo_ids` from a served template.
    ///
    /// Non-HTML responses pass through. An empty id list yields 400 and no
    /// matching photo yields 404, both with the template unchanged.
    /// Composition failures are logged and the template is returned with
    /// its original status.
    pub async fn compose(
        &self,
        photo_ids: &str,
        tenant: Option<&TenantContext>,
        response: Response,
    ) -> Response {
        if !is_html(&response) {
            return response;
        }

        let (parts, body) = response.into_parts();
        let original_status = parts.status;
        let bytes = match to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Failed to read share document body");
                return manual_response(parts, Body::empty(), 0, original_status);
            }
        };

        let Ok(html) = std::str::from_utf8(&bytes) else {
            warn!("Share document is not valid UTF-8, serving unmodified");
            return manual_response(parts, Body::from(bytes.clone()), bytes.len(), original_status);
        };

        let ids = parse_photo_ids(photo_ids);
        if ids.is_empty() {
            return html_response(parts, html, StatusCode::BAD_REQUEST);
        }

        let tenant_id = tenant.map(TenantContext::tenant_id).unwrap_or("-");
        let photos = match self.photos.find_photos_by_ids(tenant, &ids).await {
            Ok(photos) => order_by_ids(photos, &ids),
            Err(e) => {
                error!(tenant_id, error = %e, "Failed to load photos for share page");
                return html_response(parts, html, original_status);
            }
        };

        if photos.is_empty() {
            debug!(tenant_id, ids = ?ids, "No photos matched share request");
            return html_response(parts, html, StatusCode::NOT_FOUND);
        }

        let site_config = match self.site.site_config(tenant).await {
            Ok(config) => config,
            Err(e) => {
                error!(tenant_id, error = %e, "Failed to load site config for share page");
                return html_response(parts, html, original_status);
            }
        };

        match self.inject(html, &photos, &site_config) {
            Ok(composed) => html_response(parts, &composed, StatusCode::OK),
            Err(e) => {
                error!(tenant_id, error = %e, "Failed to inject data for share page");
                html_response(parts, html, original_status)
            }
        }
    }

    fn inject(
        &self,
        html: &str,
        photos: &[PhotoRecord],
        site_config: &Value,
    ) -> Result<String, ComposeError> {
        let flags = script_json("config", &serde_json::json!({ "useCloud": true }))?;
        let site = script_json("site config", site_config)?;
        let share_data = match photos {
            [single] => script_json("manifest", single)?,
            many => script_json("manifest", many)?,
        };

        let injection = ScriptInjection::new()
            .with_script(
                CONFIG_SCRIPT_SELECTOR,
                format!("window.__CONFIG__ = {};window.__SITE_CONFIG__ = {}", flags, site),
            )
            .with_script(
                MANIFEST_SCRIPT_SELECTOR,
                format!("window.__SHARE_DATA__ = {};", share_data),
            );

        transform_html(html, &injection)
    }
}

/// Arrange records in the order their ids were requested.
fn order_by_ids(mut photos: Vec<PhotoRecord>, ids: &[String]) -> Vec<PhotoRecord> {
    let mut ordered = Vec::with_capacity(photos.len());
    for id in ids {
        if let Some(index) = photos.iter().position(|photo| &photo.id == id) {
            ordered.push(photos.swap_remove(index));
        }
    }
    ordered
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

fn html_response(parts: Parts, html: &str, status: StatusCode) -> Response {
    manual_response(parts, Body::from(html.to_string()), html.len(), status)
}

fn manual_response(mut parts: Parts, body: Body, len: usize, status: StatusCode) -> Response {
    parts.status = status;
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Response::from_parts(parts, body)
}

//! CORS gate tests.
//!
//! Cover the permissive pre-initialization mode, per-tenant enforcement and
//! policy updates driven by setting notifications.

use axum::http::{header, StatusCode};
use serde_json::Value;

use async_trait::async_trait;
use gallery_gateway::{ensure_initialized, Bootstrap, StoreError, CORS_ALLOWED_ORIGINS_KEY};

use super::test_utils::{
    body_string, get, header_str, send, vary_entries, TestGateway, ALICE_HOST, ALICE_ID, BOB_HOST,
    BOB_ID,
};

const APP_ORIGIN: &str = "https://app.example.com";
const OTHER_ORIGIN: &str = "https://evil.example.com";

async fn initialized_gateway() -> TestGateway {
    let gateway = TestGateway::new();
    gateway.write(&gateway.web_roots[0], "index.html", "<html>gallery</html>");
    gateway.initialize().await;
    gateway
}

// =============================================================================
// Before Initialization
// =============================================================================

#[tokio::test]
async fn test_bootstrap_echoes_origin() {
    let gateway = TestGateway::new();

    let response = get(&gateway, "anything.example", "/health", Some(APP_ORIGIN)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(APP_ORIGIN));
    assert_eq!(
        header_str(&response, "access-control-allow-credentials"),
        Some("true")
    );
    assert_eq!(
        header_str(&response, "access-control-allow-methods"),
        Some("GET, POST, PUT, DELETE, OPTIONS")
    );
    assert_eq!(
        header_str(&response, "access-control-allow-headers"),
        Some("Content-Type, Authorization")
    );

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["initialized"], false);
}

#[tokio::test]
async fn test_bootstrap_without_origin_allows_any() {
    let gateway = TestGateway::new();

    let response = get(&gateway, ALICE_HOST, "/health", None).await;

    assert_eq!(header_str(&response, "access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_bootstrap_preflight() {
    let gateway = TestGateway::new();

    let response = send(
        &gateway,
        "OPTIONS",
        ALICE_HOST,
        "/api/photos",
        &[
            ("origin", OTHER_ORIGIN),
            ("access-control-request-method", "POST"),
            ("access-control-request-headers", "X-Upload-Token"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(OTHER_ORIGIN));
    assert_eq!(
        header_str(&response, "access-control-allow-headers"),
        Some("X-Upload-Token")
    );
    assert_eq!(
        header_str(&response, "access-control-allow-credentials"),
        Some("true")
    );
}

#[tokio::test]
async fn test_bootstrap_skips_tenant_policies() {
    let gateway = TestGateway::new();
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;

    let response = get(&gateway, ALICE_HOST, "/health", Some(OTHER_ORIGIN)).await;

    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(OTHER_ORIGIN));
}

#[tokio::test]
async fn test_initialization_read_failure_is_server_error() {
    let gateway = TestGateway::new();
    gateway.store.fail_system_reads(true);

    let response = get(&gateway, ALICE_HOST, "/", Some(APP_ORIGIN)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(header_str(&response, "access-control-allow-origin").is_none());

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "store_unavailable");
    assert_eq!(body["status"], 500);
}

/// Startup provisioning that seeds one tenant's origins.
struct SeedOrigins<'a>(&'a TestGateway);

#[async_trait]
impl<'a> Bootstrap for SeedOrigins<'a> {
    async fn provision(&self) -> Result<(), StoreError> {
        self.0.set_origins(ALICE_ID, APP_ORIGIN).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_startup_initialization_enables_enforcement() {
    let gateway = TestGateway::new();
    gateway.write(&gateway.web_roots[0], "index.html", "<html>gallery</html>");

    let before = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    assert_eq!(header_str(&before, "access-control-allow-origin"), Some(OTHER_ORIGIN));

    assert!(ensure_initialized(&gateway.gate, &SeedOrigins(&gateway))
        .await
        .unwrap());

    let after = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    assert!(header_str(&after, "access-control-allow-origin").is_none());
    assert!(header_str(&after, "access-control-allow-credentials").is_none());

    let allowed = get(&gateway, ALICE_HOST, "/", Some(APP_ORIGIN)).await;
    assert_eq!(header_str(&allowed, "access-control-allow-origin"), Some(APP_ORIGIN));

    // A restart provisions again but does not re-initialize.
    assert!(!ensure_initialized(&gateway.gate, &SeedOrigins(&gateway))
        .await
        .unwrap());
}

// =============================================================================
// Enforced Policies
// =============================================================================

#[tokio::test]
async fn test_allowed_origin_is_echoed_normalized() {
    let gateway = initialized_gateway().await;
    gateway
        .set_origins(ALICE_ID, "https://app.example.com/\nhttps://admin.example.com")
        .await;

    let response = get(&gateway, ALICE_HOST, "/", Some("https://app.example.com/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(APP_ORIGIN));
    assert_eq!(
        header_str(&response, "access-control-allow-credentials"),
        Some("true")
    );
    assert!(vary_entries(&response).contains(&"Origin".to_string()));
}

#[tokio::test]
async fn test_disallowed_origin_gets_no_cors_headers() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;

    let response = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;

    // The request itself still succeeds; the browser enforces the denial.
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, "access-control-allow-origin").is_none());
    assert!(header_str(&response, "access-control-allow-credentials").is_none());
    assert_eq!(vary_entries(&response), vec!["Origin"]);
}

#[tokio::test]
async fn test_missing_setting_allows_any_origin() {
    let gateway = initialized_gateway().await;

    let response = get(&gateway, BOB_HOST, "/", Some(OTHER_ORIGIN)).await;

    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(OTHER_ORIGIN));
}

#[tokio::test]
async fn test_wildcard_entry_allows_any_origin() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, "https://a.example, *").await;

    let response = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;

    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(OTHER_ORIGIN));
}

#[tokio::test]
async fn test_policies_are_per_tenant() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;
    gateway.set_origins(BOB_ID, OTHER_ORIGIN).await;

    let alice = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    let bob = get(&gateway, BOB_HOST, "/", Some(OTHER_ORIGIN)).await;

    assert!(header_str(&alice, "access-control-allow-origin").is_none());
    assert_eq!(header_str(&bob, "access-control-allow-origin"), Some(OTHER_ORIGIN));
}

#[tokio::test]
async fn test_unknown_host_is_denied() {
    let gateway = initialized_gateway().await;

    let response = get(&gateway, "nobody.gallery.test", "/", Some(APP_ORIGIN)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(header_str(&response, "access-control-allow-origin").is_none());
    assert!(vary_entries(&response).contains(&"Origin".to_string()));
}

#[tokio::test]
async fn test_no_origin_gets_no_cors_headers() {
    let gateway = initialized_gateway().await;

    let response = get(&gateway, ALICE_HOST, "/", None).await;

    assert!(header_str(&response, "access-control-allow-origin").is_none());
    assert!(vary_entries(&response).contains(&"Origin".to_string()));
}

#[tokio::test]
async fn test_preflight_allowed() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;

    let response = send(
        &gateway,
        "OPTIONS",
        ALICE_HOST,
        "/api/photos",
        &[
            ("origin", APP_ORIGIN),
            ("access-control-request-method", "PUT"),
            ("access-control-request-headers", "Content-Type, X-Trace"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(APP_ORIGIN));
    assert_eq!(
        header_str(&response, "access-control-allow-credentials"),
        Some("true")
    );
    assert_eq!(
        header_str(&response, "access-control-allow-methods"),
        Some("GET, POST, PUT, DELETE, OPTIONS")
    );
    assert_eq!(
        header_str(&response, "access-control-allow-headers"),
        Some("Content-Type, X-Trace")
    );

    let vary = vary_entries(&response);
    assert!(vary.contains(&"Origin".to_string()));
    assert!(vary.contains(&"Access-Control-Request-Headers".to_string()));
    assert_eq!(vary.iter().filter(|v| v.as_str() == "Origin").count(), 1);
}

#[tokio::test]
async fn test_preflight_denied() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;

    let response = send(
        &gateway,
        "OPTIONS",
        ALICE_HOST,
        "/api/photos",
        &[
            ("origin", OTHER_ORIGIN),
            ("access-control-request-method", "DELETE"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(header_str(&response, "access-control-allow-origin").is_none());
    assert!(header_str(&response, "access-control-allow-credentials").is_none());
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
}

#[tokio::test]
async fn test_policy_load_failure_denies() {
    let gateway = initialized_gateway().await;
    gateway.store.fail_tenant_reads(true);

    let response = get(&gateway, ALICE_HOST, "/", Some(APP_ORIGIN)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, "access-control-allow-origin").is_none());
    assert!(gateway.policies.policy(ALICE_ID).is_none());

    // A later request retries the load.
    gateway.store.fail_tenant_reads(false);
    let response = get(&gateway, ALICE_HOST, "/", Some(APP_ORIGIN)).await;
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(APP_ORIGIN));
}

#[tokio::test]
async fn test_policy_loaded_once() {
    let gateway = initialized_gateway().await;

    for _ in 0..3 {
        get(&gateway, ALICE_HOST, "/", Some(APP_ORIGIN)).await;
    }

    assert_eq!(gateway.store.tenant_reads(), 1);
}

// =============================================================================
// Setting Notifications
// =============================================================================

#[tokio::test]
async fn test_update_event_replaces_policy() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;

    let before = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    assert!(header_str(&before, "access-control-allow-origin").is_none());

    gateway.set_origins(ALICE_ID, OTHER_ORIGIN).await;

    let after = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    assert_eq!(header_str(&after, "access-control-allow-origin"), Some(OTHER_ORIGIN));

    let old = get(&gateway, ALICE_HOST, "/", Some(APP_ORIGIN)).await;
    assert!(header_str(&old, "access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_unrelated_setting_is_ignored() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;
    let reads = gateway.store.tenant_reads();

    gateway
        .settings
        .set_tenant_setting(ALICE_ID, "site.title", "Alice's Photos")
        .await;

    assert_eq!(gateway.store.tenant_reads(), reads);
}

#[tokio::test]
async fn test_delete_event_evicts_policy() {
    let gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;
    assert!(gateway.policies.policy(ALICE_ID).is_some());

    gateway
        .settings
        .delete_tenant_setting(ALICE_ID, CORS_ALLOWED_ORIGINS_KEY)
        .await;
    assert!(gateway.policies.policy(ALICE_ID).is_none());

    // The next request reloads: with no setting every origin is allowed.
    let response = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some(OTHER_ORIGIN));
}

#[tokio::test]
async fn test_stopped_cache_ignores_events() {
    let mut gateway = initialized_gateway().await;
    gateway.set_origins(ALICE_ID, APP_ORIGIN).await;
    gateway.stop();
    assert_eq!(gateway.events.subscription_count(), 0);

    gateway.set_origins(ALICE_ID, OTHER_ORIGIN).await;

    let response = get(&gateway, ALICE_HOST, "/", Some(OTHER_ORIGIN)).await;
    assert!(header_str(&response, "access-control-allow-origin").is_none());
}

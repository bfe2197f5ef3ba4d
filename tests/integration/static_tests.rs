//! Static document tests.
//!
//! Cover ordered root resolution, app-route fallback, tenant checks on
//! document routes and asset CORS.

use axum::http::StatusCode;
use serde_json::Value;

use super::test_utils::{
    body_string, get, header_str, send, vary_entries, TestGateway, ALICE_HOST, ALICE_ID,
    BASE_DOMAIN,
};

async fn gateway() -> TestGateway {
    let gateway = TestGateway::new();
    gateway.write(&gateway.web_roots[0], "index.html", "<html>gallery</html>");
    gateway.write(&gateway.dashboard_roots[0], "index.html", "<html>dashboard</html>");
    gateway.initialize().await;
    gateway
}

// =============================================================================
// Root Resolution
// =============================================================================

#[tokio::test]
async fn test_first_root_containing_file_wins() {
    let gateway = TestGateway::new();
    gateway.write(&gateway.web_roots[1], "index.html", "<html>from b</html>");
    gateway.write(&gateway.web_roots[2], "index.html", "<html>from c</html>");
    gateway.initialize().await;

    let response = get(&gateway, ALICE_HOST, "/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<html>from b</html>");
}

#[tokio::test]
async fn test_assets_resolve_across_roots() {
    let gateway = gateway().await;
    gateway.write(&gateway.web_roots[2], "assets/app.js", "console.log('c')");

    let response = get(&gateway, ALICE_HOST, "/assets/app.js", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, "content-type")
        .unwrap()
        .contains("javascript"));
    assert_eq!(body_string(response).await, "console.log('c')");
}

#[tokio::test]
async fn test_app_routes_fall_back_to_index() {
    let gateway = gateway().await;

    for path in ["/albums/summer", "/albums/summer/", "/missing.html"] {
        let response = get(&gateway, ALICE_HOST, path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "path {}", path);
        assert_eq!(body_string(response).await, "<html>gallery</html>");
    }
}

#[tokio::test]
async fn test_existing_html_file_is_served() {
    let gateway = gateway().await;
    gateway.write(&gateway.web_roots[1], "about.html", "<html>about</html>");

    let response = get(&gateway, ALICE_HOST, "/about.html", None).await;

    assert_eq!(body_string(response).await, "<html>about</html>");
}

#[tokio::test]
async fn test_missing_index_is_not_found() {
    let gateway = TestGateway::new();
    gateway.initialize().await;

    let response = get(&gateway, ALICE_HOST, "/", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let gateway = gateway().await;

    for path in ["/%2e%2e/secret.js", "/assets/..%2f..%2fsecret.js"] {
        let response = get(&gateway, ALICE_HOST, path, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {}", path);
    }
}

#[tokio::test]
async fn test_web_rejects_non_get() {
    let gateway = gateway().await;

    let response = send(&gateway, "POST", ALICE_HOST, "/albums", &[]).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_serves_for_tenant() {
    let gateway = gateway().await;

    for path in ["/platform", "/platform/", "/platform/photos"] {
        let response = get(&gateway, ALICE_HOST, path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "path {}", path);
        assert_eq!(body_string(response).await, "<html>dashboard</html>");
    }
}

#[tokio::test]
async fn test_dashboard_assets_strip_basename() {
    let gateway = gateway().await;
    gateway.write(&gateway.dashboard_roots[0], "assets/main.css", "body {}");

    let response = get(&gateway, ALICE_HOST, "/platform/assets/main.css", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "body {}");
}

#[tokio::test]
async fn test_tenantless_paths_on_platform_domain() {
    let gateway = gateway().await;

    let login = get(&gateway, BASE_DOMAIN, "/platform/login", None).await;
    assert_eq!(login.status(), StatusCode::OK);
    assert_eq!(body_string(login).await, "<html>dashboard</html>");

    let photos = get(&gateway, BASE_DOMAIN, "/platform/photos", None).await;
    assert_eq!(photos.status(), StatusCode::NOT_FOUND);
    assert!(body_string(photos).await.contains("Gallery not found"));
}

// =============================================================================
// Fallback Pages
// =============================================================================

#[tokio::test]
async fn test_reserved_subdomain_gets_restricted_page() {
    let gateway = gateway().await;
    let host = format!("www.{}", BASE_DOMAIN);

    let response = get(&gateway, &host, "/", None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_string(response).await;
    assert!(body.contains("This address is reserved"));
    assert!(body.contains(&host));
}

#[tokio::test]
async fn test_reserved_subdomain_restricted_even_on_tenantless_path() {
    let gateway = gateway().await;

    let response = get(&gateway, "admin.gallery.test", "/platform/login", None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_tenant_gets_missing_page() {
    let gateway = gateway().await;

    let response = get(&gateway, "carol.gallery.test", "/albums", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("Gallery not found"));
    assert!(body.contains("carol.gallery.test"));
}

#[tokio::test]
async fn test_shipped_fallback_page_overrides_builtin() {
    let gateway = gateway().await;
    gateway.write(
        &gateway.web_roots[2],
        "tenant-missing.html",
        "<html>custom missing</html>",
    );

    let response = get(&gateway, "carol.gallery.test", "/", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "<html>custom missing</html>");
}

#[tokio::test]
async fn test_documents_served_before_initialization() {
    let gateway = TestGateway::new();
    gateway.write(&gateway.web_roots[0], "index.html", "<html>gallery</html>");

    let response = get(&gateway, "carol.gallery.test", "/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<html>gallery</html>");
}

// =============================================================================
// Asset CORS
// =============================================================================

#[tokio::test]
async fn test_assets_allow_any_origin() {
    let gateway = gateway().await;
    gateway.set_origins(ALICE_ID, "https://app.example.com").await;
    gateway.write(&gateway.web_roots[0], "assets/logo.svg", "<svg/>");

    let response = get(
        &gateway,
        ALICE_HOST,
        "/assets/logo.svg",
        Some("https://embed.example.org"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some("*"));
    assert!(header_str(&response, "access-control-allow-credentials").is_none());
    assert!(vary_entries(&response).contains(&"Origin".to_string()));
}

#[tokio::test]
async fn test_missing_asset_still_allows_any_origin() {
    let gateway = gateway().await;

    let response = get(&gateway, ALICE_HOST, "/assets/nope.js", Some("https://a.example")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_str(&response, "access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_assets_served_without_tenant() {
    let gateway = gateway().await;
    gateway.write(&gateway.web_roots[0], "favicon.ico", "icon");

    let response = get(&gateway, "carol.gallery.test", "/favicon.ico", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "icon");
}

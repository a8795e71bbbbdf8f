//! Router behavior that does not depend on database contents.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use maison_integration_tests::{TEST_BASE_URL, body_text, test_app};
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_sets_security_and_request_id_headers() {
    let response = test_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    let csp = headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("img-src 'self' data: https://proj.supabase.co"));
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "no-store, max-age=0"
    );

    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-123");
}

#[tokio::test]
async fn test_robots_points_at_sitemap() {
    let response = test_app().oneshot(get("/robots.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Disallow: /admin"));
    assert!(body.contains(&format!("Sitemap: {TEST_BASE_URL}/sitemap.xml")));
}

#[tokio::test]
async fn test_unknown_path_is_not_found_page() {
    let response = test_app().oneshot(get("/no-such-page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page Not Found"));
}

#[tokio::test]
async fn test_empty_cart_page() {
    let response = test_app().oneshot(get("/cart")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_to_shop() {
    let response = test_app().oneshot(get("/checkout")).await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/shop");
}

#[tokio::test]
async fn test_tampered_cart_cookie_is_empty_cart() {
    let request = Request::builder()
        .uri("/cart")
        .header(header::COOKIE, "cart_payload=W3sicHJvZHVjdElkIjoxfV0.forged")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_admin_requires_login() {
    for uri in ["/admin", "/admin/products/new", "/admin/products/1/edit"] {
        let response = test_app().oneshot(get(uri)).await.unwrap();
        assert!(response.status().is_redirection(), "{uri}");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/admin/login",
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_admin_login_page_renders() {
    let response = test_app().oneshot(get("/admin/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("name=\"password\""));
}

#[tokio::test]
async fn test_static_assets_are_cacheable() {
    let response = test_app().oneshot(get("/static/js/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
}

//! Page and file-serving tests through the full router.
//!
//! Tests verify:
//! - The index lists public and protected albums only
//! - Album and photo pages, with and without trailing slashes
//! - Previous/next navigation at the ends of an album
//! - JSON 404s for unknown albums, photos and unaddressable names
//! - Original image streaming headers and HEAD handling

use axum::http::{header, Method, StatusCode};

use album_server::Tier;

use super::test_utils::*;

fn gallery_with_every_tier() -> TestGallery {
    let gallery = TestGallery::new();
    gallery.add_photo(Tier::Public, "summer", "a.jpg", 64, 48);
    gallery.add_photo(Tier::Public, "summer", "z.jpg", 64, 48);
    gallery.add_photo(Tier::Protected, "trip", "beach.jpg", 64, 48);
    gallery.set_password(Tier::Protected, "trip", "swordfish");
    gallery.add_photo(Tier::Private, "family", "dinner.jpg", 64, 48);
    gallery.set_password(Tier::Private, "family", "hunter2");
    gallery.add_photo(Tier::Hidden, "drafts", "sketch.jpg", 64, 48);
    gallery
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(TestGallery::new());

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

// =============================================================================
// Index
// =============================================================================

#[tokio::test]
async fn test_index_lists_public_and_protected_only() {
    let app = TestApp::new(gallery_with_every_tier());

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;

    assert!(html.contains("/album/summer/"));
    assert!(html.contains("/album/trip/"));
    assert!(html.contains("/preview/trip"));
    assert!(html.contains("class=\"lock\""));
    assert!(!html.contains("family"));
    assert!(!html.contains("drafts"));
}

#[tokio::test]
async fn test_index_with_no_albums() {
    let app = TestApp::new(TestGallery::new());

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("No albums yet."));
    assert!(!html.contains("/forget-passwords"));
}

// =============================================================================
// Album and Photo Pages
// =============================================================================

#[tokio::test]
async fn test_album_page_with_and_without_slash() {
    let app = TestApp::new(gallery_with_every_tier());

    for uri in ["/album/summer/", "/album/summer"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let html = body_string(response).await;
        assert!(html.contains("<h1>summer</h1>"));
        assert!(html.contains("/album/summer/a.jpg/thumbnail"));
        assert!(html.contains("/album/summer/z.jpg/thumbnail"));
    }
}

#[tokio::test]
async fn test_album_page_ignores_housekeeping_directories() {
    let app = TestApp::new(gallery_with_every_tier());

    let html = body_string(app.get("/album/summer/").await).await;
    assert!(!html.contains("/album/summer/thumbnails/"));
    assert!(!html.contains("/album/summer/display/"));
    assert!(!html.contains("/album/summer/meta/"));
}

#[tokio::test]
async fn test_photo_page_navigation() {
    let app = TestApp::new(gallery_with_every_tier());

    let response = app.get("/album/summer/z.jpg/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;

    assert!(html.contains("<title>z</title>"));
    assert!(html.contains(r#"class="previous" href="/album/summer/a.jpg/""#));
    assert!(!html.contains("class=\"next\""));
    assert!(html.contains("/album/summer/z.jpg/display"));
    assert!(html.contains("/album/summer/z.jpg/original"));

    let html = body_string(app.get("/album/summer/a.jpg").await).await;
    assert!(html.contains(r#"class="next" href="/album/summer/z.jpg/""#));
    assert!(!html.contains("class=\"previous\""));
}

#[tokio::test]
async fn test_hidden_album_reachable_by_link() {
    let app = TestApp::new(gallery_with_every_tier());

    let response = app.get("/album/drafts/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("sketch.jpg"));
}

// =============================================================================
// Not Found
// =============================================================================

#[tokio::test]
async fn test_unknown_album_is_json_404() {
    let app = TestApp::new(gallery_with_every_tier());

    let response = app.get("/album/nowhere/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_unknown_photo_is_404() {
    let app = TestApp::new(gallery_with_every_tier());

    for uri in [
        "/album/summer/missing.jpg/",
        "/album/summer/missing.jpg/original",
        "/album/summer/missing.jpg/thumbnail",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
    assert_eq!(app.transcoder.total_calls(), 0);
}

#[tokio::test]
async fn test_dot_names_are_not_albums() {
    let gallery = gallery_with_every_tier();
    gallery.album(Tier::Public, ".secret");
    let app = TestApp::new(gallery);

    let response = app.get("/album/.secret/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/album/%2E%2E/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Originals
// =============================================================================

#[tokio::test]
async fn test_original_served_with_caching_headers() {
    let app = TestApp::new(gallery_with_every_tier());
    let on_disk = std::fs::read(
        app.gallery
            .album_dir(Tier::Public, "summer")
            .join("a.jpg"),
    )
    .unwrap();

    let response = app.get("/album/summer/a.jpg/original").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        on_disk.len().to_string().as_str()
    );
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert!(headers.contains_key(header::ETAG));
    assert!(headers.contains_key(header::LAST_MODIFIED));

    let body = body_bytes(response).await;
    assert_eq!(body, on_disk);
    assert_eq!(app.transcoder.total_calls(), 0);
}

#[tokio::test]
async fn test_head_original_has_headers_but_no_body() {
    let app = TestApp::new(gallery_with_every_tier());

    let response = app
        .request(Method::HEAD, "/album/summer/a.jpg/original", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::CONTENT_LENGTH));
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// Static Assets
// =============================================================================

#[tokio::test]
async fn test_static_assets_served() {
    let gallery = TestGallery::new();
    std::fs::write(gallery.static_dir().join("style.css"), "body { margin: 0 }").unwrap();
    let app = TestApp::new(gallery);

    let response = app.get("/static/style.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "body { margin: 0 }");

    let response = app.get("/static/missing.css").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

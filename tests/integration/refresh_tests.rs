//! Album cache refresh tests.
//!
//! Tests verify:
//! - Albums are cached until a refresh with the right password
//! - A wrong password is answered only after the throttle delay
//! - Attempts arriving while another is held are turned away

use std::time::{Duration, Instant};

use axum::http::StatusCode;

use album_server::Tier;

use super::test_utils::*;

fn refresh_uri(password: &str) -> String {
    format!("/refresh?password={}", urlencoding::encode(password))
}

#[tokio::test]
async fn test_new_photo_hidden_until_refresh() {
    let gallery = TestGallery::new();
    gallery.add_photo(Tier::Public, "summer", "a.jpg", 32, 32);
    let app = TestApp::new(gallery);

    let html = body_string(app.get("/album/summer/").await).await;
    assert!(html.contains("a.jpg"));

    app.gallery.add_photo(Tier::Public, "summer", "b.jpg", 32, 32);
    let html = body_string(app.get("/album/summer/").await).await;
    assert!(!html.contains("b.jpg"));
    let response = app.get("/album/summer/b.jpg/original").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get(&refresh_uri(REFRESH_PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = body_string(app.get("/album/summer/").await).await;
    assert!(html.contains("b.jpg"));
}

#[tokio::test]
async fn test_new_album_listed_after_refresh() {
    let gallery = TestGallery::new();
    gallery.add_photo(Tier::Public, "summer", "a.jpg", 32, 32);
    let app = TestApp::new(gallery);

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("/album/summer/"));
    assert_eq!(app.registry.cached_count().await, 1);

    app.gallery.add_photo(Tier::Public, "winter", "snow.jpg", 32, 32);
    app.get(&refresh_uri(REFRESH_PASSWORD)).await;
    assert_eq!(app.registry.cached_count().await, 0);

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("/album/winter/"));
}

#[tokio::test]
async fn test_wrong_password_is_throttled() {
    let gallery = TestGallery::new();
    gallery.add_photo(Tier::Public, "summer", "a.jpg", 32, 32);
    let app = TestApp::new(gallery);
    app.get("/album/summer/").await;

    let start = Instant::now();
    let response = app.get(&refresh_uri("guess")).await;
    assert!(start.elapsed() >= REFRESH_DELAY);
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response).await, "incorrect password");
    assert_eq!(app.registry.cached_count().await, 1);
}

#[tokio::test]
async fn test_missing_password_is_rejected() {
    let app = TestApp::new(TestGallery::new());

    let response = app.get("/refresh").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_attempt_during_throttle_is_busy() {
    let gallery = TestGallery::new();
    gallery.add_photo(Tier::Public, "summer", "a.jpg", 32, 32);
    let app = TestApp::new(gallery);
    app.get("/album/summer/").await;

    let router = app.router.clone();
    let wrong = tokio::spawn(async move {
        use tower::ServiceExt;
        let request = axum::http::Request::builder()
            .uri("/refresh?password=guess")
            .body(axum::body::Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    });
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Not checked, even with the right password
    let response = app.get(&refresh_uri(REFRESH_PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_string(response).await, "wait");
    assert_eq!(app.registry.cached_count().await, 1);

    assert_eq!(wrong.await.unwrap(), StatusCode::FORBIDDEN);

    let response = app.get(&refresh_uri(REFRESH_PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.registry.cached_count().await, 0);
}

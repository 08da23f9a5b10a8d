//! On-demand derivative tests through the full router.
//!
//! Tests verify:
//! - Thumbnails and display images are generated once, then served from disk
//! - Generated images fit their bounding boxes
//! - Album previews are cropped to the banner size
//! - Concurrent requests for one derivative share a single transcode
//! - Transcoder failures surface as 500 and are retried on the next request

use std::time::Duration;

use axum::http::{header, StatusCode};
use futures::future::join_all;

use album_server::Tier;

use super::test_utils::*;

fn gallery_with_summer() -> TestGallery {
    let gallery = TestGallery::new();
    gallery.add_photo(Tier::Public, "summer", "a.jpg", 800, 600);
    gallery.add_photo(Tier::Public, "summer", "b.jpg", 300, 400);
    gallery
}

fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(bytes).unwrap();
    (image.width(), image.height())
}

// =============================================================================
// Thumbnails and Display Images
// =============================================================================

#[tokio::test]
async fn test_thumbnail_generated_then_cached() {
    let app = TestApp::new(gallery_with_summer());
    let cached = app
        .gallery
        .album_dir(Tier::Public, "summer")
        .join("thumbnails")
        .join("a.jpg");
    assert!(!cached.exists());

    let response = app.get("/album/summer/a.jpg/thumbnail").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = body_bytes(response).await;
    assert!(is_valid_jpeg(&bytes));
    assert_eq!(dimensions(&bytes), (96, 72));
    assert!(cached.exists());
    assert_eq!(app.transcoder.resize_count(), 1);

    let response = app.get("/album/summer/a.jpg/thumbnail").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, bytes);
    assert_eq!(app.transcoder.resize_count(), 1);
}

#[tokio::test]
async fn test_portrait_thumbnail_fits_box() {
    let app = TestApp::new(gallery_with_summer());

    let bytes = body_bytes(app.get("/album/summer/b.jpg/thumbnail").await).await;
    assert_eq!(dimensions(&bytes), (72, 96));
}

#[tokio::test]
async fn test_display_image_generated() {
    let app = TestApp::new(gallery_with_summer());

    let response = app.get("/album/summer/a.jpg/display").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert_eq!(dimensions(&bytes), (640, 480));

    assert!(app
        .gallery
        .album_dir(Tier::Public, "summer")
        .join("display")
        .join("a.jpg")
        .exists());
}

#[tokio::test]
async fn test_existing_derivative_is_not_regenerated() {
    let gallery = gallery_with_summer();
    let thumbnails = gallery.album_dir(Tier::Public, "summer").join("thumbnails");
    std::fs::create_dir_all(&thumbnails).unwrap();
    write_jpeg(&thumbnails.join("a.jpg"), 10, 10);
    let app = TestApp::new(gallery);

    let bytes = body_bytes(app.get("/album/summer/a.jpg/thumbnail").await).await;
    assert_eq!(dimensions(&bytes), (10, 10));
    assert_eq!(app.transcoder.total_calls(), 0);
}

// =============================================================================
// Previews
// =============================================================================

#[tokio::test]
async fn test_preview_cropped_to_banner() {
    let app = TestApp::new(gallery_with_summer());

    let response = app.get("/preview/summer").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert_eq!(dimensions(&bytes), (288, 96));
    assert_eq!(app.transcoder.resize_count(), 1);
    assert_eq!(app.transcoder.crop_count(), 1);

    assert!(app
        .gallery
        .album_dir(Tier::Public, "summer")
        .join("meta")
        .join("preview.jpg")
        .exists());

    // Served from disk on the second request
    let response = app.get("/preview/summer").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.transcoder.total_calls(), 2);
}

#[tokio::test]
async fn test_preview_of_empty_album_is_no_content() {
    let gallery = TestGallery::new();
    gallery.album(Tier::Public, "empty");
    let app = TestApp::new(gallery);

    let response = app.get("/preview/empty").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(app.transcoder.total_calls(), 0);
}

#[tokio::test]
async fn test_preview_of_unknown_album() {
    let app = TestApp::new(TestGallery::new());

    let response = app.get("/preview/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_requests_share_one_transcode() {
    let app = TestApp::with_transcoder(
        gallery_with_summer(),
        RecordingTranscoder::slow(Duration::from_millis(100)),
    );

    let responses = join_all((0..6).map(|_| app.get("/album/summer/a.jpg/thumbnail"))).await;
    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(dimensions(&body_bytes(response).await), (96, 72));
    }
    assert_eq!(app.transcoder.resize_count(), 1);
}

#[tokio::test]
async fn test_different_derivatives_all_complete() {
    let app = TestApp::with_transcoder(
        gallery_with_summer(),
        RecordingTranscoder::slow(Duration::from_millis(20)),
    );

    let uris = [
        "/album/summer/a.jpg/thumbnail",
        "/album/summer/b.jpg/thumbnail",
        "/album/summer/a.jpg/display",
        "/album/summer/b.jpg/display",
    ];
    let responses = join_all(uris.iter().map(|uri| app.get(uri))).await;
    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(app.transcoder.resize_count(), 4);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_transcode_failure_is_500() {
    let app = TestApp::with_transcoder(gallery_with_summer(), RecordingTranscoder::failing());

    let response = app.get("/album/summer/a.jpg/thumbnail").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["error"], "transcode_error");

    assert!(!app
        .gallery
        .album_dir(Tier::Public, "summer")
        .join("thumbnails")
        .join("a.jpg")
        .exists());

    // Failures are not cached; the next request tries again
    let response = app.get("/album/summer/a.jpg/thumbnail").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.transcoder.resize_count(), 2);
}

#[tokio::test]
async fn test_corrupt_photo_is_500() {
    let gallery = TestGallery::new();
    let dir = gallery.album(Tier::Public, "broken");
    std::fs::write(dir.join("bad.jpg"), b"not a jpeg").unwrap();
    let app = TestApp::new(gallery);

    let response = app.get("/album/broken/bad.jpg/display").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The original is still served as-is
    let response = app.get("/album/broken/bad.jpg/original").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"not a jpeg");
}

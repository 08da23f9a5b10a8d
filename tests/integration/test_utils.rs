//! Test utilities for integration tests.
//!
//! This module provides an on-disk album tree builder, a transcoder that
//! counts its calls, and helpers for driving the router.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use album_server::{
    create_router, AlbumRegistry, AppState, CropRequest, DerivativeRequest, DerivativeResolver,
    ImageCrateTranscoder, ImageTranscoder, LocalFilesystem, RefreshGate, ResizeQueue,
    RouterConfig, SessionStore, Tier, TranscodeError,
};

/// Refresh secret used by every test app.
pub const REFRESH_PASSWORD: &str = "letmein";

/// Throttle applied to wrong refresh secrets in tests.
pub const REFRESH_DELAY: Duration = Duration::from_millis(150);

// =============================================================================
// Album Tree
// =============================================================================

/// A temporary album root with the four tier directories.
pub struct TestGallery {
    dir: TempDir,
}

impl TestGallery {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for tier in Tier::ALL {
            std::fs::create_dir_all(dir.path().join(tier.dir_name())).unwrap();
        }
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn static_dir(&self) -> PathBuf {
        self.dir.path().join("static")
    }

    /// Create an empty album directory and return its path.
    pub fn album(&self, tier: Tier, name: &str) -> PathBuf {
        let path = self.album_dir(tier, name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn album_dir(&self, tier: Tier, name: &str) -> PathBuf {
        self.dir.path().join(tier.dir_name()).join(name)
    }

    /// Add a real JPEG of the given size to an album (creating it if needed).
    pub fn add_photo(&self, tier: Tier, album: &str, photo: &str, width: u32, height: u32) {
        let dir = self.album(tier, album);
        write_jpeg(&dir.join(photo), width, height);
    }

    /// Write `meta/password` for an album.
    pub fn set_password(&self, tier: Tier, album: &str, password: &str) {
        let meta = self.album(tier, album).join("meta");
        std::fs::create_dir_all(&meta).unwrap();
        std::fs::write(meta.join("password"), format!("{}\n", password)).unwrap();
    }
}

impl Default for TestGallery {
    fn default() -> Self {
        Self::new()
    }
}

/// Write an RGB gradient JPEG.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x % 256) as u8;
        let g = (y % 256) as u8;
        let b = ((x + y) % 256) as u8;
        Rgb([r, g, b])
    });
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

/// Check for the JPEG SOI marker.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0xFF && data[1] == 0xD8
}

// =============================================================================
// Recording Transcoder
// =============================================================================

/// Real `image` crate transcoder that counts calls and can be made to fail.
pub struct RecordingTranscoder {
    inner: ImageCrateTranscoder,
    resizes: AtomicUsize,
    crops: AtomicUsize,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingTranscoder {
    pub fn new() -> Self {
        Self {
            inner: ImageCrateTranscoder::new(),
            resizes: AtomicUsize::new(0),
            crops: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        let transcoder = Self::new();
        transcoder.fail.store(true, Ordering::SeqCst);
        transcoder
    }

    pub fn resize_count(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }

    pub fn crop_count(&self) -> usize {
        self.crops.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.resize_count() + self.crop_count()
    }

    async fn before_job(&self) -> Result<(), TranscodeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TranscodeError::Failed {
                message: "convert: no decode delegate".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ImageTranscoder for RecordingTranscoder {
    async fn resize(&self, request: &DerivativeRequest) -> Result<(), TranscodeError> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.before_job().await?;
        self.inner.resize(request).await
    }

    async fn crop_to_box(&self, request: &CropRequest) -> Result<(), TranscodeError> {
        self.crops.fetch_add(1, Ordering::SeqCst);
        self.before_job().await?;
        self.inner.crop_to_box(request).await
    }
}

// =============================================================================
// Test App
// =============================================================================

/// Router plus handles on the components behind it.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<AlbumRegistry<LocalFilesystem>>,
    pub sessions: Arc<SessionStore>,
    pub transcoder: Arc<RecordingTranscoder>,
    pub gallery: TestGallery,
}

impl TestApp {
    pub fn new(gallery: TestGallery) -> Self {
        Self::with_transcoder(gallery, RecordingTranscoder::new())
    }

    pub fn with_transcoder(gallery: TestGallery, transcoder: RecordingTranscoder) -> Self {
        let registry = Arc::new(AlbumRegistry::new(LocalFilesystem::new(), gallery.root()));
        let transcoder = Arc::new(transcoder);
        let queue = ResizeQueue::new(transcoder.clone());
        let resolver = Arc::new(DerivativeResolver::new(registry.clone(), queue));
        let gate = Arc::new(RefreshGate::with_delay(
            registry.clone(),
            REFRESH_PASSWORD,
            REFRESH_DELAY,
        ));
        let sessions = Arc::new(SessionStore::new());

        let state = AppState::new(registry.clone(), resolver, gate).with_sessions(sessions.clone());
        let config = RouterConfig::new()
            .with_cache_max_age(3600)
            .with_static_dir(gallery.static_dir())
            .with_tracing(false);

        Self {
            router: create_router(state, config),
            registry,
            sessions,
            transcoder,
            gallery,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Method::GET, uri, None).await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.request(Method::GET, uri, Some(cookie)).await
    }

    pub async fn request(&self, method: Method, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST the album password form.
    pub async fn post_password(
        &self,
        uri: &str,
        password: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = format!("password={}", urlencoding::encode(password));
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Log in to an album and return the `name=value` cookie pair.
    pub async fn login(&self, album: &str, password: &str) -> String {
        let uri = format!("/authenticate?album={}&redirect=%2F", album);
        let response = self.post_password(&uri, password, None).await;
        set_cookie_pair(&response).expect("login should set a session cookie")
    }
}

// =============================================================================
// Response Helpers
// =============================================================================

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn location<B>(response: &Response<B>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response should have a Location header")
        .to_str()
        .unwrap()
}

/// `name=value` part of the `Set-Cookie` header, if any.
pub fn set_cookie_pair<B>(response: &Response<B>) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(|pair| pair.trim().to_string())
}

/// Session id from a `gallery_session=<id>` cookie pair.
pub fn session_id(cookie: &str) -> &str {
    cookie
        .strip_prefix("gallery_session=")
        .expect("cookie should be the session cookie")
}

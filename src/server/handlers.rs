//! HTTP request handlers for the album server.
//!
//! # Endpoints
//!
//! - `GET /` - Album index (public and protected albums)
//! - `GET /album/{album}/` - Album page
//! - `GET /album/{album}/{photo}/` - Photo page
//! - `GET /album/{album}/{photo}/{original|display|thumbnail}` - Image bytes
//! - `GET /preview/{album}` - Album preview banner
//! - `GET|POST /authenticate` - Album password form
//! - `GET /forget-passwords` - Drop all remembered passwords
//! - `GET /refresh` - Reload albums from disk
//! - `GET /health` - Health check endpoint

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{Form, Path, Query, State},
    http::{header, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::access::{Access, AccessControl, Session, SessionStore};
use crate::album::{AlbumInfo, AlbumRegistry, FilesystemProbe, RefreshGate, RefreshOutcome, Tier};
use crate::error::{AlbumError, DerivativeError, ProbeError, TranscodeError};
use crate::derivative::{DerivativeKind, DerivativeResolver};

use super::pages;
use super::session::{safe_redirect, session_cookie, SessionId};

/// Default Cache-Control max-age for images (one week).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 7 * 24 * 60 * 60;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Every component is owned here and handed to handlers through Axum's
/// State extractor; nothing in the server is process-global.
pub struct AppState<P: FilesystemProbe> {
    pub registry: Arc<AlbumRegistry<P>>,
    pub resolver: Arc<DerivativeResolver<P>>,
    pub refresh_gate: Arc<RefreshGate<P>>,
    pub sessions: Arc<SessionStore>,
    pub access: AccessControl,

    /// Cache-Control max-age in seconds for image responses
    pub cache_max_age: u32,
}

impl<P: FilesystemProbe> AppState<P> {
    pub fn new(
        registry: Arc<AlbumRegistry<P>>,
        resolver: Arc<DerivativeResolver<P>>,
        refresh_gate: Arc<RefreshGate<P>>,
    ) -> Self {
        Self {
            registry,
            resolver,
            refresh_gate,
            sessions: Arc::new(SessionStore::new()),
            access: AccessControl::new(),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }

    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    async fn load_session(&self, id: &SessionId) -> Session {
        match id.as_deref() {
            Some(id) => self.sessions.load(id).await.unwrap_or_default(),
            None => Session::new(),
        }
    }

    /// `Some(redirect)` when the session may not view `album`.
    fn require_access(&self, session: &Session, album: &AlbumInfo, uri: &Uri) -> Option<Response> {
        match self.access.authorize(session, album) {
            Access::Allowed => None,
            Access::RequiresPassword => {
                debug!(album = %album.name, "Password required, redirecting");
                Some(Redirect::to(&authenticate_url(&album.name, uri_target(uri), false)).into_response())
            }
        }
    }
}

impl<P: FilesystemProbe> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            resolver: Arc::clone(&self.resolver),
            refresh_gate: Arc::clone(&self.refresh_gate),
            sessions: Arc::clone(&self.sessions),
            access: self.access,
            cache_max_age: self.cache_max_age,
        }
    }
}

/// Path and query of the current request, used as the post-login target.
fn uri_target(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

/// URL of the password form for `album` returning to `redirect`.
fn authenticate_url(album: &str, redirect: &str, wrong: bool) -> String {
    let mut url = format!(
        "/authenticate?album={}&redirect={}",
        urlencoding::encode(album),
        urlencoding::encode(redirect)
    );
    if wrong {
        url.push_str("&wrong=1");
    }
    url
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters of `/authenticate`.
#[derive(Debug, Deserialize)]
pub struct AuthenticateParams {
    /// Album the password is for
    pub album: String,

    /// Where to go after a successful login (site-relative)
    #[serde(default)]
    pub redirect: Option<String>,

    /// Set after a failed attempt
    #[serde(default)]
    pub wrong: Option<String>,
}

/// Form body posted to `/authenticate`.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub password: String,
}

/// Query parameters of `/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    #[serde(default)]
    pub password: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "transcode_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log by severity and build the JSON error body.
///
/// 404s are routine and logged at DEBUG, other 4xx at WARN, 5xx at ERROR.
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(error_type, status = status.as_u16(), "Server error: {}", message);
    } else if status == StatusCode::NOT_FOUND {
        debug!(error_type, status = status.as_u16(), "Resource not found: {}", message);
    } else {
        warn!(error_type, status = status.as_u16(), "Client error: {}", message);
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

impl IntoResponse for AlbumError {
    fn into_response(self) -> Response {
        // Unreadable album directories look the same as missing ones
        if let AlbumError::Discovery { name, source } = &self {
            warn!(album = %name, error = %source, "Album discovery failed");
        }
        error_response(StatusCode::NOT_FOUND, "not_found", self.to_string())
    }
}

impl IntoResponse for DerivativeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            DerivativeError::Album(err) => return err.clone().into_response(),
            DerivativeError::PhotoNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            DerivativeError::Probe(ProbeError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            DerivativeError::Probe(ProbeError::Io { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "io_error")
            }
            DerivativeError::Transcode(TranscodeError::WorkerGone) => {
                (StatusCode::SERVICE_UNAVAILABLE, "worker_unavailable")
            }
            DerivativeError::Transcode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transcode_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

// =============================================================================
// File Streaming
// =============================================================================

/// Content type for an image file, from its extension (JPEG if unknown).
pub fn content_type_for(path: &FsPath) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Entity tag in the `"<size>-<mtime-ms>"` form.
fn entity_tag(size: u64, modified: SystemTime) -> String {
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("\"{}-{}\"", size, millis)
}

/// HTTP-date (RFC 7231 IMF-fixdate) for `Last-Modified`.
fn http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Stream `path` with caching headers. HEAD requests get headers only.
async fn serve_file(
    path: &FsPath,
    method: &Method,
    cache_max_age: u32,
) -> Result<Response, DerivativeError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ProbeError::from_io(path, e))?;
    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    let size = metadata.len();

    let body = if *method == Method::HEAD {
        Body::empty()
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))?;
        Body::from_stream(ReaderStream::new(file))
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(path).to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", cache_max_age),
            ),
            (header::LAST_MODIFIED, http_date(modified)),
            (header::ETAG, entity_tag(size, modified)),
        ],
        body,
    )
        .into_response())
}

// =============================================================================
// Page Handlers
// =============================================================================

/// Handle the album index.
///
/// `GET /` lists public and protected albums, newest first. Private and
/// hidden albums are only reachable by direct link.
pub async fn index_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    session_id: SessionId,
) -> Html<String> {
    let albums = state.registry.list_by_tiers(&Tier::LISTED).await;
    let session = state.load_session(&session_id).await;
    Html(pages::index_page(&albums, session.has_passwords()))
}

/// Handle an album page: `GET /album/{album}/`.
pub async fn album_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Path(album): Path<String>,
    session_id: SessionId,
    uri: Uri,
) -> Result<Response, AlbumError> {
    let album = state.registry.resolve(&album, None).await?;
    let session = state.load_session(&session_id).await;

    if let Some(redirect) = state.require_access(&session, &album, &uri) {
        return Ok(redirect);
    }

    Ok(Html(pages::album_page(&album, session.has_passwords())).into_response())
}

/// Handle a photo page: `GET /album/{album}/{photo}/`.
pub async fn photo_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Path((album, photo)): Path<(String, String)>,
    session_id: SessionId,
    uri: Uri,
) -> Result<Response, DerivativeError> {
    let album = state.registry.resolve(&album, None).await?;
    let session = state.load_session(&session_id).await;

    if let Some(redirect) = state.require_access(&session, &album, &uri) {
        return Ok(redirect);
    }

    let neighbors = album
        .neighbors(&photo)
        .ok_or_else(|| DerivativeError::PhotoNotFound {
            album: album.name.clone(),
            photo: photo.clone(),
        })?;

    Ok(Html(pages::photo_page(
        &album,
        &photo,
        &neighbors,
        session.has_passwords(),
    ))
    .into_response())
}

// =============================================================================
// Image Handlers
// =============================================================================

async fn serve_rendition<P: FilesystemProbe + 'static>(
    state: AppState<P>,
    album: String,
    photo: String,
    kind: DerivativeKind,
    session_id: SessionId,
    uri: Uri,
    method: Method,
) -> Result<Response, DerivativeError> {
    let album = state.registry.resolve(&album, None).await?;
    let session = state.load_session(&session_id).await;

    if let Some(redirect) = state.require_access(&session, &album, &uri) {
        return Ok(redirect);
    }

    let path = state.resolver.resolve(&album, &photo, kind).await?;
    serve_file(&path, &method, state.cache_max_age).await
}

/// Handle `GET /album/{album}/{photo}/original`.
pub async fn original_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Path((album, photo)): Path<(String, String)>,
    session_id: SessionId,
    method: Method,
    uri: Uri,
) -> Result<Response, DerivativeError> {
    serve_rendition(state, album, photo, DerivativeKind::Original, session_id, uri, method).await
}

/// Handle `GET /album/{album}/{photo}/display`.
///
/// Generates the display image on first request; the response waits for
/// the resize queue.
pub async fn display_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Path((album, photo)): Path<(String, String)>,
    session_id: SessionId,
    method: Method,
    uri: Uri,
) -> Result<Response, DerivativeError> {
    serve_rendition(state, album, photo, DerivativeKind::Display, session_id, uri, method).await
}

/// Handle `GET /album/{album}/{photo}/thumbnail`.
pub async fn thumbnail_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Path((album, photo)): Path<(String, String)>,
    session_id: SessionId,
    method: Method,
    uri: Uri,
) -> Result<Response, DerivativeError> {
    serve_rendition(state, album, photo, DerivativeKind::Thumbnail, session_id, uri, method).await
}

/// Handle `GET /preview/{album}`.
///
/// No access check: previews of protected albums appear on the index page.
/// An album without photos answers `204 No Content`.
pub async fn preview_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Path(album): Path<String>,
    method: Method,
) -> Result<Response, DerivativeError> {
    let album = state.registry.resolve(&album, None).await?;

    match state.resolver.resolve_preview(&album).await? {
        Some(path) => serve_file(&path, &method, state.cache_max_age).await,
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

// =============================================================================
// Session Handlers
// =============================================================================

/// Handle `GET /authenticate?album=&redirect=&wrong=`: render the password form.
pub async fn authenticate_form_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Query(params): Query<AuthenticateParams>,
) -> Result<Html<String>, AlbumError> {
    let album = state.registry.resolve(&params.album, None).await?;
    let redirect = safe_redirect(params.redirect.as_deref());

    Ok(Html(pages::authenticate_page(
        &album,
        redirect,
        params.wrong.is_some(),
    )))
}

/// Handle `POST /authenticate?album=&redirect=` with a `password` form field.
///
/// On success the password is remembered in the session (creating one if
/// needed) and the visitor is sent to `redirect`. On failure the visitor is
/// sent back to the form with `wrong=1` and the session is left as it was.
pub async fn authenticate_submit_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    session_id: SessionId,
    Query(params): Query<AuthenticateParams>,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AlbumError> {
    let album = state.registry.resolve(&params.album, None).await?;
    let redirect = safe_redirect(params.redirect.as_deref());

    if !state.access.check_password(&album, &form.password) {
        warn!(album = %album.name, "Wrong album password");
        return Ok(Redirect::to(&authenticate_url(&album.name, redirect, true)).into_response());
    }

    let access = state.access;
    let id = state
        .sessions
        .update(session_id.as_deref(), |session| {
            access.record_success(session, &album, &form.password)
        })
        .await;
    info!(album = %album.name, "Album unlocked");

    let mut response = Redirect::to(redirect).into_response();
    if let Some(cookie) = session_cookie(&id) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Handle `GET /forget-passwords`: clear remembered passwords and go home.
pub async fn forget_passwords_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    session_id: SessionId,
) -> Redirect {
    if let Some(id) = session_id.as_deref() {
        let access = state.access;
        if state
            .sessions
            .update_existing(id, |session| access.forget(session))
            .await
        {
            debug!("Session passwords cleared");
        }
    }
    Redirect::to("/")
}

/// Handle `GET /refresh?password=`.
///
/// - correct password: albums are reloaded, redirect to `/`
/// - wrong password: `403 incorrect password`, after the throttle delay
/// - another attempt pending: `429 wait`
pub async fn refresh_handler<P: FilesystemProbe + 'static>(
    State(state): State<AppState<P>>,
    Query(params): Query<RefreshParams>,
) -> Response {
    let provided = params.password.unwrap_or_default();

    match state.refresh_gate.request_invalidation(&provided).await {
        RefreshOutcome::Accepted => Redirect::to("/").into_response(),
        RefreshOutcome::Rejected => (StatusCode::FORBIDDEN, "incorrect password").into_response(),
        RefreshOutcome::Busy => (StatusCode::TOO_MANY_REQUESTS, "wait").into_response(),
    }
}

/// Handle health check requests.
///
/// `GET /health` returns `{"status": "healthy", "version": "..."}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================

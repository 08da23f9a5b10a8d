//! Router configuration for the album server.
//!
//! # Route Structure
//!
//! ```text
//! /                                      - Album index
//! /album/{album}/                        - Album page (password gated)
//! /album/{album}/{photo}/                - Photo page (password gated)
//! /album/{album}/{photo}/original        - Original bytes (password gated)
//! /album/{album}/{photo}/display         - Display image (password gated)
//! /album/{album}/{photo}/thumbnail       - Thumbnail (password gated)
//! /preview/{album}                       - Album preview banner
//! /authenticate                          - Password form (GET) and submit (POST)
//! /forget-passwords                      - Clear remembered passwords
//! /refresh                               - Reload albums from disk
//! /health                                - Health check
//! /static/*                              - Static assets (optional)
//! ```
//!
//! Page routes answer with and without the trailing slash.
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(registry, resolver, refresh_gate);
//! let router = create_router(state, RouterConfig::new().with_cache_max_age(3600));
//!
//! let listener = tokio::net::TcpListener::bind("[::1]:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    album_handler, authenticate_form_handler, authenticate_submit_handler, display_handler,
    forget_passwords_handler, health_handler, index_handler, original_handler, photo_handler,
    preview_handler, refresh_handler, thumbnail_handler, AppState, DEFAULT_CACHE_MAX_AGE,
};
use crate::album::FilesystemProbe;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Cache-Control max-age in seconds for images
    pub cache_max_age: u32,

    /// Directory served under `/static`, if any
    pub static_dir: Option<PathBuf>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with a one week cache max-age, no
    /// static directory and tracing enabled.
    pub fn new() -> Self {
        Self {
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            static_dir: None,
            enable_tracing: true,
        }
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Serve files from `dir` under `/static`.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// `config.cache_max_age` overrides the value carried by `state`.
pub fn create_router<P>(state: AppState<P>, config: RouterConfig) -> Router
where
    P: FilesystemProbe + 'static,
{
    let state = state.with_cache_max_age(config.cache_max_age);

    let mut router = Router::new()
        .route("/", get(index_handler::<P>))
        .route("/health", get(health_handler))
        .route("/refresh", get(refresh_handler::<P>))
        .route("/forget-passwords", get(forget_passwords_handler::<P>))
        .route(
            "/authenticate",
            get(authenticate_form_handler::<P>).post(authenticate_submit_handler::<P>),
        )
        .route("/preview/{album}", get(preview_handler::<P>))
        .route("/album/{album}", get(album_handler::<P>))
        .route("/album/{album}/", get(album_handler::<P>))
        .route("/album/{album}/{photo}", get(photo_handler::<P>))
        .route("/album/{album}/{photo}/", get(photo_handler::<P>))
        .route("/album/{album}/{photo}/original", get(original_handler::<P>))
        .route("/album/{album}/{photo}/display", get(display_handler::<P>))
        .route("/album/{album}/{photo}/thumbnail", get(thumbnail_handler::<P>))
        .with_state(state);

    if let Some(dir) = &config.static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================

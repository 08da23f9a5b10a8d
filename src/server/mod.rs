//! HTTP server layer for the album server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        /album/{album}/{photo}/{original|display|thumbnail}      │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────────┐  ┌──────────┐  │
//! │  │  handlers   │  │   session   │  │   pages   │  │  routes  │  │
//! │  │ (requests)  │  │  (cookie)   │  │  (HTML)   │  │ (router) │  │
//! │  └─────────────┘  └─────────────┘  └───────────┘  └──────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod pages;
pub mod routes;
pub mod session;

pub use handlers::{
    album_handler, authenticate_form_handler, authenticate_submit_handler, content_type_for,
    display_handler, forget_passwords_handler, health_handler, index_handler, original_handler,
    photo_handler, preview_handler, refresh_handler, thumbnail_handler, AppState,
    AuthenticateParams, ErrorResponse, HealthResponse, PasswordForm, RefreshParams,
    DEFAULT_CACHE_MAX_AGE,
};
pub use routes::{create_router, RouterConfig};
pub use session::{safe_redirect, session_cookie, SessionId, SESSION_COOKIE};

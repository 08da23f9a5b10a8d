//! # Album Server
//!
//! A photo album server that serves albums straight from a directory tree.
//!
//! Each album is a folder of JPEGs under one of four tier directories that
//! decide who may see it. Thumbnails, display-sized images and album preview
//! banners are generated on first request and cached next to the originals.
//!
//! ## Features
//!
//! - **Directory-backed albums**: no database, the filesystem is the catalogue
//! - **Access tiers**: public, protected (password, listed), private
//!   (password, unlisted) and hidden (unlisted)
//! - **On-demand derivatives**: a single-worker LIFO resize queue in front of
//!   the `image` crate or ImageMagick
//! - **Cheap reads**: album metadata is cached until an explicit refresh
//!
//! ## Architecture
//!
//! - [`album`] - Album discovery, metadata cache and refresh gate
//! - [`access`] - Sessions and tier-based access rules
//! - [`derivative`] - Transcoders, resize queue and derivative resolver
//! - [`server`] - Axum-based HTTP server, pages and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use album_server::{
//!     create_router, AlbumRegistry, AppState, DerivativeResolver, ImageCrateTranscoder,
//!     LocalFilesystem, RefreshGate, ResizeQueue, RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(AlbumRegistry::new(LocalFilesystem::new(), "example/albums"));
//!     let queue = ResizeQueue::new(Arc::new(ImageCrateTranscoder::new()));
//!     let resolver = Arc::new(DerivativeResolver::new(registry.clone(), queue));
//!     let gate = Arc::new(RefreshGate::new(registry.clone(), "secret"));
//!
//!     let router = create_router(AppState::new(registry, resolver, gate), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("[::1]:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod access;
pub mod album;
pub mod config;
pub mod derivative;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use access::{Access, AccessControl, Session, SessionStore};
pub use album::{
    photo_title, AlbumInfo, AlbumRegistry, FilesystemProbe, LocalFilesystem, PhotoNeighbors,
    RefreshGate, RefreshOutcome, Tier,
};
pub use config::{Config, TranscoderKind};
pub use derivative::{
    CropRequest, DerivativeKind, DerivativeRequest, DerivativeResolver, DerivativeSizes,
    ImageCrateTranscoder, ImageTranscoder, MagickTranscoder, PreviewSelection, ResizeQueue,
    TranscodeJob,
};
pub use error::{AlbumError, DerivativeError, ProbeError, TranscodeError};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};

//! Album discovery layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      HTTP Handlers / Derivatives        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐   ┌──────────────┐
//! │             AlbumRegistry               │◄──│ RefreshGate  │
//! │   (caches AlbumInfo, singleflight)      │   │ (throttled   │
//! └────────────────────┬────────────────────┘   │ invalidation)│
//!                      │                        └──────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           FilesystemProbe               │
//! │  (stat / list / read over album root)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # On-disk layout
//!
//! ```text
//! <album root>/
//!   public/ protected/ private/ hidden/
//!     <album>/
//!       *.jpg
//!       thumbnails/  display/
//!       meta/password  meta/preview.jpg
//! ```

mod info;
mod probe;
mod refresh;
mod registry;

pub use info::{
    photo_title, AlbumInfo, PhotoNeighbors, Tier, DISPLAY_DIR, META_DIR, PASSWORD_FILE,
    PREVIEW_FILE, THUMBNAILS_DIR,
};
pub use probe::{FilesystemProbe, LocalFilesystem};
pub use refresh::{RefreshGate, RefreshOutcome, DEFAULT_REFRESH_DELAY};
pub use registry::AlbumRegistry;

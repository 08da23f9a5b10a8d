//! Photo derivatives: thumbnails, display images and album previews.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          DerivativeResolver             │
//! │ (cache check, in-flight de-duplication) │
//! └────────────────────┬────────────────────┘
//!                      │ TranscodeJob
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ResizeQueue                 │
//! │     (one worker, newest job first)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ImageTranscoder               │
//! │   (image crate or ImageMagick convert)  │
//! └─────────────────────────────────────────┘
//! ```

mod queue;
mod resolver;
mod transcoder;

pub use queue::ResizeQueue;
pub use resolver::{
    DerivativeKind, DerivativeResolver, DerivativeSizes, PreviewSelection,
    DEFAULT_DISPLAY_SIZE, DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH, DEFAULT_THUMBNAIL_SIZE,
};
pub use transcoder::{
    CropRequest, DerivativeRequest, ImageCrateTranscoder, ImageTranscoder, MagickTranscoder,
    TranscodeJob, DEFAULT_JPEG_QUALITY,
};

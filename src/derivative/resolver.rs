//! Map (album, photo, kind) to a file on disk, generating it on first use.
//!
//! Derivatives live next to the originals (`thumbnails/`, `display/` and
//! `meta/preview.jpg`) and are never invalidated: once the file exists it is
//! served as-is, even if the original changes later.
//!
//! Concurrent requests for the same missing derivative share a single queued
//! job, so a burst of identical thumbnail requests transcodes once.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use rand::Rng;
use tracing::debug;

use crate::album::{AlbumInfo, AlbumRegistry, FilesystemProbe, DISPLAY_DIR, THUMBNAILS_DIR};
use crate::error::{DerivativeError, TranscodeError};

use super::queue::ResizeQueue;
use super::transcoder::{CropRequest, DerivativeRequest, TranscodeJob};

/// Default bounding box (pixels) for thumbnails.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 96;

/// Default bounding box (pixels) for display images.
pub const DEFAULT_DISPLAY_SIZE: u32 = 640;

/// Default album preview banner size.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 288;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 96;

// =============================================================================
// Kinds and settings
// =============================================================================

/// Which rendition of a photo is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivativeKind {
    /// Small square-bounded image, metadata stripped
    Thumbnail,
    /// Screen-sized image, metadata kept
    Display,
    /// The original file, served untouched
    Original,
}

impl DerivativeKind {
    /// Cache subdirectory inside the album, `None` for originals.
    pub fn subdir(self) -> Option<&'static str> {
        match self {
            DerivativeKind::Thumbnail => Some(THUMBNAILS_DIR),
            DerivativeKind::Display => Some(DISPLAY_DIR),
            DerivativeKind::Original => None,
        }
    }

    /// Whether the generated file drops EXIF and similar metadata.
    pub fn strips_metadata(self) -> bool {
        matches!(self, DerivativeKind::Thumbnail)
    }
}

/// Pixel sizes of the generated derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeSizes {
    pub thumbnail: u32,
    pub display: u32,
    pub preview_width: u32,
    pub preview_height: u32,
}

impl Default for DerivativeSizes {
    fn default() -> Self {
        Self {
            thumbnail: DEFAULT_THUMBNAIL_SIZE,
            display: DEFAULT_DISPLAY_SIZE,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
        }
    }
}

/// How the photo behind an album preview is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewSelection {
    /// First photo in sorted order, stable across restarts
    #[default]
    First,
    /// Any photo, picked at random when the preview is first generated
    Random,
}

impl fmt::Display for PreviewSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewSelection::First => write!(f, "first"),
            PreviewSelection::Random => write!(f, "random"),
        }
    }
}

impl FromStr for PreviewSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(PreviewSelection::First),
            "random" => Ok(PreviewSelection::Random),
            other => Err(format!(
                "unknown preview selection '{}', expected 'first' or 'random'",
                other
            )),
        }
    }
}

// =============================================================================
// DerivativeResolver
// =============================================================================

type SharedJob = Shared<BoxFuture<'static, Result<(), TranscodeError>>>;

/// Resolves photo renditions to files, queueing generation when missing.
pub struct DerivativeResolver<P: FilesystemProbe> {
    registry: Arc<AlbumRegistry<P>>,
    queue: ResizeQueue,
    sizes: DerivativeSizes,
    preview_selection: PreviewSelection,

    /// Destination path -> job currently generating it
    in_flight: Mutex<HashMap<PathBuf, SharedJob>>,
}

impl<P: FilesystemProbe> DerivativeResolver<P> {
    pub fn new(registry: Arc<AlbumRegistry<P>>, queue: ResizeQueue) -> Self {
        Self {
            registry,
            queue,
            sizes: DerivativeSizes::default(),
            preview_selection: PreviewSelection::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sizes(mut self, sizes: DerivativeSizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_preview_selection(mut self, selection: PreviewSelection) -> Self {
        self.preview_selection = selection;
        self
    }

    pub fn sizes(&self) -> DerivativeSizes {
        self.sizes
    }

    pub fn queue(&self) -> &ResizeQueue {
        &self.queue
    }

    /// Path of the requested rendition of `photo`, generating it if needed.
    ///
    /// Fails with [`DerivativeError::PhotoNotFound`] when `photo` is not one
    /// of the album's photos, and with the transcoder's error when
    /// generation fails (no partial file is served).
    pub async fn resolve(
        &self,
        album: &AlbumInfo,
        photo: &str,
        kind: DerivativeKind,
    ) -> Result<PathBuf, DerivativeError> {
        if !album.contains_photo(photo) {
            return Err(DerivativeError::PhotoNotFound {
                album: album.name.clone(),
                photo: photo.to_string(),
            });
        }

        let subdir = match kind.subdir() {
            Some(subdir) => subdir,
            None => return Ok(album.photo_path(photo)),
        };

        let destination = album.subdir_path(subdir, photo);
        if self.registry.probe().exists(&destination).await {
            return Ok(destination);
        }

        let size = match kind {
            DerivativeKind::Thumbnail => self.sizes.thumbnail,
            _ => self.sizes.display,
        };
        let request = DerivativeRequest::new(
            album.photo_path(photo),
            destination.clone(),
            size,
            Some(size),
            kind.strips_metadata(),
        );

        debug!(album = %album.name, photo, ?kind, "Derivative missing, queueing");
        let queue = self.queue.clone();
        self.run_once(&destination, move || {
            queue.enqueue(TranscodeJob::Resize(request)).boxed()
        })
        .await?;

        Ok(destination)
    }

    /// Path of the album's preview banner, generating it if needed.
    ///
    /// Returns `Ok(None)` for an album with no photos. Generation is a
    /// width-bound resize of one photo followed by a centered crop, queued
    /// as two separate jobs.
    pub async fn resolve_preview(
        &self,
        album: &AlbumInfo,
    ) -> Result<Option<PathBuf>, DerivativeError> {
        if album.photos.is_empty() {
            return Ok(None);
        }

        let destination = album.preview_path();
        if self.registry.probe().exists(&destination).await {
            return Ok(Some(destination));
        }

        let source = self.select_preview_source(album);
        debug!(album = %album.name, source, "Preview missing, queueing");

        // Both steps work on a staging file; the preview appears only once cropped
        let staging = staging_path(&destination);
        let resize = DerivativeRequest::new(
            album.photo_path(source),
            staging.clone(),
            self.sizes.preview_width,
            None,
            true,
        );
        let crop = CropRequest {
            path: staging.clone(),
            width: self.sizes.preview_width,
            height: self.sizes.preview_height,
        };

        let queue = self.queue.clone();
        let target = destination.clone();
        self.run_once(&destination, move || {
            async move {
                let staged = async {
                    queue.enqueue(TranscodeJob::Resize(resize)).await?;
                    queue.enqueue(TranscodeJob::Crop(crop)).await
                }
                .await;

                match staged {
                    Ok(()) => tokio::fs::rename(&staging, &target).await.map_err(|e| {
                        TranscodeError::Io {
                            message: format!("{}: {}", staging.display(), e),
                        }
                    }),
                    Err(e) => {
                        // Nothing may be left at the staging path after a failed step
                        let _ = tokio::fs::remove_file(&staging).await;
                        Err(e)
                    }
                }
            }
            .boxed()
        })
        .await?;

        Ok(Some(destination))
    }

    fn select_preview_source<'a>(&self, album: &'a AlbumInfo) -> &'a str {
        let index = match self.preview_selection {
            PreviewSelection::First => 0,
            PreviewSelection::Random => rand::rng().random_range(0..album.photos.len()),
        };
        &album.photos[index]
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<PathBuf, SharedJob>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Await the job generating `destination`, starting one with `start` if
    /// none is running.
    async fn run_once<F>(&self, destination: &Path, start: F) -> Result<(), TranscodeError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<(), TranscodeError>>,
    {
        let job = {
            let mut in_flight = self.lock_in_flight();
            match in_flight.get(destination) {
                // A finished entry is left behind only if every waiter was dropped
                Some(job) if job.peek().is_none() => {
                    debug!(destination = %destination.display(), "Joining in-flight derivative job");
                    job.clone()
                }
                _ => {
                    let job = start().shared();
                    in_flight.insert(destination.to_path_buf(), job.clone());
                    job
                }
            }
        };

        let result = job.await;

        let mut in_flight = self.lock_in_flight();
        if in_flight
            .get(destination)
            .is_some_and(|job| job.peek().is_some())
        {
            in_flight.remove(destination);
        }

        result
    }

    /// Number of derivatives currently being generated.
    pub fn in_flight_count(&self) -> usize {
        self.lock_in_flight().len()
    }
}

/// Hidden sibling of `destination` used while a preview is being built.
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".staging-{}", name))
}

//! Image transcoding jobs and the backends that execute them.
//!
//! The resolver decides *what* derivative to build; an [`ImageTranscoder`]
//! is the black box that does the pixel work. Two backends are provided:
//!
//! | Backend | How |
//! |---|---|
//! | [`ImageCrateTranscoder`] | `image` crate on the blocking pool, pure Rust |
//! | [`MagickTranscoder`] | ImageMagick `convert` subprocess |
//!
//! Both write to a hidden sibling file and rename it into place, so a
//! derivative path either does not exist or holds a complete image.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::TranscodeError;

/// Default JPEG quality for generated derivatives.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

// =============================================================================
// Jobs
// =============================================================================

/// A resize of one source image into one destination file.
///
/// Fully determines the job; fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeRequest {
    source: PathBuf,
    destination: PathBuf,
    width: u32,
    height: Option<u32>,
    strip_metadata: bool,
}

impl DerivativeRequest {
    /// Resize `source` to fit within `width` x `height` (or to `width` when
    /// no height is given), preserving aspect ratio.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        width: u32,
        height: Option<u32>,
        strip_metadata: bool,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            width,
            height,
            strip_metadata,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn strip_metadata(&self) -> bool {
        self.strip_metadata
    }
}

/// An in-place crop of `path` to a `width` x `height` box anchored at the center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropRequest {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Unit of work for the resize queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeJob {
    Resize(DerivativeRequest),
    Crop(CropRequest),
}

impl TranscodeJob {
    /// The file this job writes.
    pub fn target(&self) -> &Path {
        match self {
            TranscodeJob::Resize(request) => request.destination(),
            TranscodeJob::Crop(request) => &request.path,
        }
    }
}

// =============================================================================
// ImageTranscoder Trait
// =============================================================================

/// External image transcoding capability.
///
/// Calls may block for a long time and have no timeout; the resize queue
/// guarantees at most one call is running at any instant.
#[async_trait]
pub trait ImageTranscoder: Send + Sync {
    /// Resize `request.source()` into `request.destination()`.
    async fn resize(&self, request: &DerivativeRequest) -> Result<(), TranscodeError>;

    /// Crop `request.path` in place to a centered box.
    async fn crop_to_box(&self, request: &CropRequest) -> Result<(), TranscodeError>;

    /// Execute a queued job.
    async fn run(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        match job {
            TranscodeJob::Resize(request) => self.resize(request).await,
            TranscodeJob::Crop(request) => self.crop_to_box(request).await,
        }
    }
}

/// Hidden sibling of `path` used while a derivative is being written.
///
/// Keeps the extension so the output format can still be inferred from it.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".partial-{}", name))
}

fn io_error(path: &Path, err: impl std::fmt::Display) -> TranscodeError {
    TranscodeError::Io {
        message: format!("{}: {}", path.display(), err),
    }
}

// =============================================================================
// image crate backend
// =============================================================================

/// Pure Rust transcoder built on the `image` crate.
///
/// Re-encoding never carries over EXIF/IPTC blocks, so every derivative
/// produced by this backend is metadata-free regardless of
/// `strip_metadata`.
#[derive(Debug, Clone)]
pub struct ImageCrateTranscoder {
    quality: u8,
}

impl ImageCrateTranscoder {
    pub fn new() -> Self {
        Self::with_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Create a transcoder encoding JPEG output at `quality` (clamped to 1-100).
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for ImageCrateTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageTranscoder for ImageCrateTranscoder {
    async fn resize(&self, request: &DerivativeRequest) -> Result<(), TranscodeError> {
        let request = request.clone();
        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let image = load_image(request.source())?;
            let (width, height) = fit_dimensions(
                image.width(),
                image.height(),
                request.width(),
                request.height(),
            );
            let resized = image.resize_exact(width, height, FilterType::Lanczos3);
            write_atomically(&resized, request.destination(), quality)
        })
        .await
        .map_err(|e| TranscodeError::Failed {
            message: format!("resize task failed: {}", e),
        })?
    }

    async fn crop_to_box(&self, request: &CropRequest) -> Result<(), TranscodeError> {
        let request = request.clone();
        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let image = load_image(&request.path)?;
            let (x, y, width, height) =
                center_box(image.width(), image.height(), request.width, request.height);
            let cropped = image.crop_imm(x, y, width, height);
            write_atomically(&cropped, &request.path, quality)
        })
        .await
        .map_err(|e| TranscodeError::Failed {
            message: format!("crop task failed: {}", e),
        })?
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, TranscodeError> {
    ImageReader::open(path)
        .map_err(|e| io_error(path, e))?
        .with_guessed_format()
        .map_err(|e| io_error(path, e))?
        .decode()
        .map_err(|e| TranscodeError::Failed {
            message: format!("Failed to decode {}: {}", path.display(), e),
        })
}

/// Target size for fitting `width` x `height` into the requested box,
/// preserving aspect ratio. Without a box height only the width is bound.
pub(crate) fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: Option<u32>,
) -> (u32, u32) {
    let w_ratio = max_width as f64 / width.max(1) as f64;
    let ratio = match max_height {
        Some(max_height) => w_ratio.min(max_height as f64 / height.max(1) as f64),
        None => w_ratio,
    };

    let new_width = ((width as f64 * ratio).round() as u32).max(1);
    let new_height = ((height as f64 * ratio).round() as u32).max(1);
    (new_width, new_height)
}

/// Centered crop box `(x, y, width, height)`, clamped to the image.
pub(crate) fn center_box(width: u32, height: u32, box_width: u32, box_height: u32) -> (u32, u32, u32, u32) {
    let crop_width = box_width.min(width);
    let crop_height = box_height.min(height);
    (
        (width - crop_width) / 2,
        (height - crop_height) / 2,
        crop_width,
        crop_height,
    )
}

/// Encode `image` next to `destination` and rename it into place.
fn write_atomically(
    image: &DynamicImage,
    destination: &Path,
    quality: u8,
) -> Result<(), TranscodeError> {
    let format = ImageFormat::from_path(destination).unwrap_or(ImageFormat::Jpeg);
    let partial = partial_path(destination);

    let encoded = (|| {
        let file = File::create(&partial).map_err(|e| io_error(&partial, e))?;
        let mut writer = BufWriter::new(file);
        let result = match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
                image.to_rgb8().write_with_encoder(encoder)
            }
            other => image.write_to(&mut writer, other),
        };
        result.map_err(|e| TranscodeError::Failed {
            message: format!("Failed to encode {}: {}", destination.display(), e),
        })?;
        writer.flush().map_err(|e| io_error(&partial, e))
    })();

    if let Err(e) = encoded {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }

    std::fs::rename(&partial, destination).map_err(|e| io_error(destination, e))
}

// =============================================================================
// ImageMagick backend
// =============================================================================

/// Transcoder that shells out to ImageMagick's `convert`.
#[derive(Debug, Clone)]
pub struct MagickTranscoder {
    binary: PathBuf,
}

impl MagickTranscoder {
    /// Use `binary` (e.g. `convert` or `/usr/bin/convert`) for all jobs.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for a resize job writing to `output`.
    pub(crate) fn resize_args(request: &DerivativeRequest, output: &Path) -> Vec<String> {
        let geometry = match request.height() {
            Some(height) => format!("{}x{}", request.width(), height),
            None => request.width().to_string(),
        };

        let mut args = vec![
            request.source().display().to_string(),
            "-resize".to_string(),
            geometry,
        ];
        if request.strip_metadata() {
            args.push("-strip".to_string());
        }
        args.push(output.display().to_string());
        args
    }

    /// Arguments for a centered crop of `request.path` writing to `output`.
    pub(crate) fn crop_args(request: &CropRequest, output: &Path) -> Vec<String> {
        vec![
            request.path.display().to_string(),
            "-gravity".to_string(),
            "center".to_string(),
            "-crop".to_string(),
            format!("{}x{}+0+0", request.width, request.height),
            "+repage".to_string(),
            output.display().to_string(),
        ]
    }

    async fn convert(&self, args: Vec<String>, target: &Path) -> Result<(), TranscodeError> {
        let partial = partial_path(target);
        let mut args = args;
        if let Some(last) = args.last_mut() {
            *last = partial.display().to_string();
        }

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| io_error(&self.binary, e))?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(TranscodeError::Failed {
                message: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        tokio::fs::rename(&partial, target)
            .await
            .map_err(|e| io_error(target, e))
    }
}

#[async_trait]
impl ImageTranscoder for MagickTranscoder {
    async fn resize(&self, request: &DerivativeRequest) -> Result<(), TranscodeError> {
        let args = Self::resize_args(request, request.destination());
        self.convert(args, request.destination()).await
    }

    async fn crop_to_box(&self, request: &CropRequest) -> Result<(), TranscodeError> {
        let args = Self::crop_args(request, &request.path);
        self.convert(args, &request.path).await
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Configuration management for the album server.
//!
//! Every option can be given on the command line or through an environment
//! variable with the `GALLERY_` prefix:
//!
//! - `GALLERY_ALBUM_DIR` - Album root directory (default: example/albums)
//! - `GALLERY_HOST` - Server bind address (default: ::1)
//! - `GALLERY_PORT` - Server port (default: 8080)
//! - `GALLERY_REFRESH_PASSWORD` - Secret for `/refresh` (default: password)
//! - `GALLERY_REFRESH_DELAY_MS` - Delay after a wrong refresh secret (default: 1000)
//! - `GALLERY_THUMBNAIL_SIZE` - Thumbnail bounding box (default: 96)
//! - `GALLERY_DISPLAY_SIZE` - Display image bounding box (default: 640)
//! - `GALLERY_PREVIEW_WIDTH` / `GALLERY_PREVIEW_HEIGHT` - Preview banner (default: 288x96)
//! - `GALLERY_PREVIEW_SELECTION` - `first` or `random` (default: first)
//! - `GALLERY_TRANSCODER` - `image` or `magick` (default: image)
//! - `GALLERY_MAGICK_BINARY` - ImageMagick convert binary (default: convert)
//! - `GALLERY_JPEG_QUALITY` - Derivative JPEG quality (default: 85)
//! - `GALLERY_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: one week)
//! - `GALLERY_STATIC_DIR` - Optional directory served under `/static`
//! - `GALLERY_SESSION_IDLE_HOURS` - Idle time before a session is forgotten (default: 720)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::derivative::{
    DerivativeSizes, PreviewSelection, DEFAULT_DISPLAY_SIZE, DEFAULT_JPEG_QUALITY,
    DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH, DEFAULT_THUMBNAIL_SIZE,
};
use crate::server::DEFAULT_CACHE_MAX_AGE;

// =============================================================================
// Default Values
// =============================================================================

/// Default album root, relative to the working directory.
pub const DEFAULT_ALBUM_DIR: &str = "example/albums";

/// Default server host (IPv6 loopback).
pub const DEFAULT_HOST: &str = "::1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default refresh secret. Anyone who knows it can flush the album cache.
pub const DEFAULT_REFRESH_PASSWORD: &str = "password";

/// Default refresh throttle in milliseconds.
pub const DEFAULT_REFRESH_DELAY_MS: u64 = 1000;

/// Default session idle timeout in hours (30 days).
pub const DEFAULT_SESSION_IDLE_HOURS: u64 = 30 * 24;

/// Default ImageMagick binary.
pub const DEFAULT_MAGICK_BINARY: &str = "convert";

/// Which backend generates derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranscoderKind {
    /// Pure Rust `image` crate, no external tools
    Image,
    /// ImageMagick `convert` subprocess
    Magick,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Album server - serves photo albums straight from a directory tree.
///
/// Albums are folders under public/, protected/, private/ and hidden/.
/// Thumbnails, display images and previews are generated on first request.
#[derive(Parser, Debug, Clone)]
#[command(name = "album-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Root directory holding the tier directories.
    #[arg(long, default_value = DEFAULT_ALBUM_DIR, env = "GALLERY_ALBUM_DIR")]
    pub album_dir: PathBuf,

    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    /// Directory served under /static (stylesheets and similar assets).
    #[arg(long, env = "GALLERY_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    // =========================================================================
    // Refresh Configuration
    // =========================================================================
    /// Secret required by /refresh to reload albums from disk.
    #[arg(long, default_value = DEFAULT_REFRESH_PASSWORD, env = "GALLERY_REFRESH_PASSWORD")]
    pub refresh_password: String,

    /// How long a wrong refresh secret blocks further attempts (milliseconds).
    #[arg(long, default_value_t = DEFAULT_REFRESH_DELAY_MS, env = "GALLERY_REFRESH_DELAY_MS")]
    pub refresh_delay_ms: u64,

    // =========================================================================
    // Derivative Configuration
    // =========================================================================
    /// Bounding box for thumbnails, in pixels.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE, env = "GALLERY_THUMBNAIL_SIZE")]
    pub thumbnail_size: u32,

    /// Bounding box for display images, in pixels.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_SIZE, env = "GALLERY_DISPLAY_SIZE")]
    pub display_size: u32,

    /// Width of album preview banners.
    #[arg(long, default_value_t = DEFAULT_PREVIEW_WIDTH, env = "GALLERY_PREVIEW_WIDTH")]
    pub preview_width: u32,

    /// Height of album preview banners.
    #[arg(long, default_value_t = DEFAULT_PREVIEW_HEIGHT, env = "GALLERY_PREVIEW_HEIGHT")]
    pub preview_height: u32,

    /// Which photo becomes the album preview: first or random.
    #[arg(long, default_value = "first", env = "GALLERY_PREVIEW_SELECTION")]
    pub preview_selection: PreviewSelection,

    /// Image backend used to generate derivatives.
    #[arg(long, value_enum, default_value_t = TranscoderKind::Image, env = "GALLERY_TRANSCODER")]
    pub transcoder: TranscoderKind,

    /// ImageMagick binary used by the magick transcoder.
    #[arg(long, default_value = DEFAULT_MAGICK_BINARY, env = "GALLERY_MAGICK_BINARY")]
    pub magick_binary: PathBuf,

    /// JPEG quality for generated derivatives (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "GALLERY_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// HTTP Cache-Control max-age in seconds for images.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "GALLERY_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Hours of inactivity after which a visitor's session is forgotten.
    #[arg(long, default_value_t = DEFAULT_SESSION_IDLE_HOURS, env = "GALLERY_SESSION_IDLE_HOURS")]
    pub session_idle_hours: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.album_dir.as_os_str().is_empty() {
            return Err(
                "Album directory is required. Set --album-dir or GALLERY_ALBUM_DIR".to_string(),
            );
        }

        if self.refresh_password.is_empty() {
            return Err(
                "Refresh password must not be empty. Set --refresh-password or GALLERY_REFRESH_PASSWORD"
                    .to_string(),
            );
        }

        if self.thumbnail_size == 0 || self.display_size == 0 {
            return Err("thumbnail_size and display_size must be greater than 0".to_string());
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err("preview_width and preview_height must be greater than 0".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.session_idle_hours == 0 {
            return Err("session_idle_hours must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port", bracketing IPv6 hosts.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Whether the refresh secret is still the well-known default.
    pub fn uses_default_refresh_password(&self) -> bool {
        self.refresh_password == DEFAULT_REFRESH_PASSWORD
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_hours * 60 * 60)
    }

    /// Derivative sizes grouped for the resolver.
    pub fn derivative_sizes(&self) -> DerivativeSizes {
        DerivativeSizes {
            thumbnail: self.thumbnail_size,
            display: self.display_size,
            preview_width: self.preview_width,
            preview_height: self.preview_height,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

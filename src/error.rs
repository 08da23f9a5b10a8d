use thiserror::Error;

/// Errors from the filesystem primitives the registry is built on.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// Path does not exist
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Any other I/O failure (permission denied, not a directory, ...)
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl ProbeError {
    /// Build a `ProbeError` from a `std::io::Error` for the given path.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProbeError::NotFound(path.display().to_string())
        } else {
            ProbeError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Errors raised while resolving albums from the album root.
#[derive(Debug, Clone, Error)]
pub enum AlbumError {
    /// No tier directory contains an album with this name
    #[error("Album not found: {name}")]
    NotFound { name: String },

    /// Name can never refer to an album directory (empty, path separators, ...)
    #[error("Invalid album name: {name:?}")]
    InvalidName { name: String },

    /// The album directory exists but could not be read
    #[error("Failed to discover album {name}: {source}")]
    Discovery {
        name: String,
        #[source]
        source: ProbeError,
    },
}

/// Errors reported by an image transcoder or the resize queue.
#[derive(Debug, Clone, Error)]
pub enum TranscodeError {
    /// The transcoder ran and reported a failure
    #[error("Transcoding failed: {message}")]
    Failed { message: String },

    /// Reading the source or writing the destination failed
    #[error("Transcoder I/O error: {message}")]
    Io { message: String },

    /// The queue worker dropped the job without answering
    #[error("Resize worker went away before the job completed")]
    WorkerGone,
}

/// Errors returned when resolving an image derivative to a file path.
#[derive(Debug, Clone, Error)]
pub enum DerivativeError {
    /// The album could not be resolved
    #[error(transparent)]
    Album(#[from] AlbumError),

    /// The album has no photo with this filename
    #[error("Photo not found: {photo} in album {album}")]
    PhotoNotFound { album: String, photo: String },

    /// Generating the derivative failed; nothing is served
    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    /// Filesystem error while checking the derivative cache
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

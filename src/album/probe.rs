//! Filesystem primitives used for album discovery.
//!
//! The registry never touches `std::fs`/`tokio::fs` directly; it goes through
//! [`FilesystemProbe`] so tests can observe or slow down discovery.

use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::ProbeError;

/// Stat/list primitives over the album root. Implementations hold no album state.
#[async_trait]
pub trait FilesystemProbe: Send + Sync {
    /// `true` if `path` exists and is a directory.
    async fn is_directory(&self, path: &Path) -> bool;

    /// `true` if anything exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Names of the entries directly under `path`, sorted ascending.
    async fn list_entries(&self, path: &Path) -> Result<Vec<String>, ProbeError>;

    /// Read a whole file as UTF-8.
    async fn read_to_string(&self, path: &Path) -> Result<String, ProbeError>;

    /// Creation time of `path`, falling back to its modification time on
    /// filesystems that do not record birth time.
    async fn creation_time(&self, path: &Path) -> Result<SystemTime, ProbeError>;

    /// Create `path` as a directory if nothing exists there yet.
    async fn ensure_directory(&self, path: &Path) -> Result<(), ProbeError>;
}

/// [`FilesystemProbe`] over the local disk using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FilesystemProbe for LocalFilesystem {
    async fn is_directory(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn list_entries(&self, path: &Path) -> Result<Vec<String>, ProbeError> {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ProbeError::from_io(path, e))?
        {
            // Non-UTF-8 names cannot be addressed from a URL
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, ProbeError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))
    }

    async fn creation_time(&self, path: &Path) -> Result<SystemTime, ProbeError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProbeError::from_io(path, e))?;

        metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| ProbeError::from_io(path, e))
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), ProbeError> {
        if self.is_directory(path).await {
            return Ok(());
        }
        match tokio::fs::create_dir(path).await {
            Ok(()) => Ok(()),
            // Lost a race with another creator
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(ProbeError::from_io(path, e)),
        }
    }
}

//! Album metadata as discovered from the album root.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Subdirectory holding generated thumbnails.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Subdirectory holding generated display-size images.
pub const DISPLAY_DIR: &str = "display";

/// Subdirectory holding the password file and cached preview.
pub const META_DIR: &str = "meta";

/// Password sidecar, relative to the album directory.
pub const PASSWORD_FILE: &str = "meta/password";

/// Cached album preview, relative to the album directory.
pub const PREVIEW_FILE: &str = "meta/preview.jpg";

/// Directory entries that are never photos.
pub(crate) const RESERVED_ENTRIES: &[&str] = &[META_DIR, DISPLAY_DIR, THUMBNAILS_DIR];

/// OS housekeeping files that show up next to photos.
pub(crate) const HOUSEKEEPING_ENTRIES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// `true` if a directory entry should be skipped when listing photos or albums.
pub(crate) fn is_ignored_entry(name: &str) -> bool {
    RESERVED_ENTRIES.contains(&name) || HOUSEKEEPING_ENTRIES.contains(&name) || name.starts_with('.')
}

// =============================================================================
// Tier
// =============================================================================

/// Access classification of an album, taken from the top-level directory it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Listed and readable by anyone
    Public,
    /// Listed, password required
    Protected,
    /// Unlisted, password required
    Private,
    /// Unlisted, readable by anyone holding the link
    Hidden,
}

impl Tier {
    /// Probe order used when resolving an album without a tier hint.
    pub const ALL: [Tier; 4] = [Tier::Public, Tier::Protected, Tier::Private, Tier::Hidden];

    /// Tiers shown on the album index.
    pub const LISTED: [Tier; 2] = [Tier::Public, Tier::Protected];

    /// Name of the tier directory under the album root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::Protected => "protected",
            Tier::Private => "private",
            Tier::Hidden => "hidden",
        }
    }

    /// Whether albums in this tier are gated behind the album password.
    pub fn requires_password(self) -> bool {
        matches!(self, Tier::Protected | Tier::Private)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.dir_name() == s)
            .ok_or_else(|| format!("unknown tier: {}", s))
    }
}

// =============================================================================
// AlbumInfo
// =============================================================================

/// Previous/next photo around a given photo in an album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoNeighbors {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Metadata for one album directory.
///
/// Built once by the registry and shared as `Arc<AlbumInfo>`; never mutated
/// afterwards.
#[derive(Debug, Clone)]
pub struct AlbumInfo {
    /// Album name, equal to its directory name
    pub name: String,

    /// Tier the album was discovered in
    pub tier: Tier,

    /// Absolute path of the album directory
    pub directory: PathBuf,

    /// Directory creation time, used for newest-first ordering
    pub created_at: SystemTime,

    /// Shared album password, only for tiers that require one
    pub password: Option<String>,

    /// Photo filenames sorted ascending
    pub photos: Vec<String>,
}

impl AlbumInfo {
    /// Display title of the album.
    pub fn title(&self) -> &str {
        &self.name
    }

    /// Site-relative URL of the album page.
    pub fn url(&self) -> String {
        format!("/album/{}/", urlencoding::encode(&self.name))
    }

    /// Site-relative URL of the album preview image.
    pub fn preview_url(&self) -> String {
        format!("/preview/{}", urlencoding::encode(&self.name))
    }

    /// Creation date as `MM/DD/YYYY` in local time.
    pub fn created_display(&self) -> String {
        let created: DateTime<Local> = self.created_at.into();
        created.format("%m/%d/%Y").to_string()
    }

    /// Whether `photo` is one of this album's photos.
    pub fn contains_photo(&self, photo: &str) -> bool {
        self.photo_index(photo).is_some()
    }

    /// Position of `photo` in the sorted photo list.
    pub fn photo_index(&self, photo: &str) -> Option<usize> {
        self.photos.iter().position(|p| p == photo)
    }

    /// Previous and next photos around `photo`, or `None` if it is not in the album.
    pub fn neighbors(&self, photo: &str) -> Option<PhotoNeighbors> {
        let index = self.photo_index(photo)?;
        Some(PhotoNeighbors {
            previous: index
                .checked_sub(1)
                .and_then(|i| self.photos.get(i))
                .cloned(),
            next: self.photos.get(index + 1).cloned(),
        })
    }

    /// Path of the original photo file.
    pub fn photo_path(&self, photo: &str) -> PathBuf {
        self.directory.join(photo)
    }

    /// Path of the album's cached preview image.
    pub fn preview_path(&self) -> PathBuf {
        self.directory.join(PREVIEW_FILE)
    }

    /// Path of a file inside one of the album's subdirectories.
    pub fn subdir_path(&self, subdir: &str, file: &str) -> PathBuf {
        self.directory.join(subdir).join(file)
    }

    /// Directory the album lives in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Photo title shown on the detail page: the filename without a JPEG extension.
pub fn photo_title(photo: &str) -> &str {
    for ext in [".JPG", ".jpg", ".jpeg"] {
        if let Some(stem) = photo.strip_suffix(ext) {
            return stem;
        }
    }
    photo
}

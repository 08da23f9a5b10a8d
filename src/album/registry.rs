//! Album Registry for discovering and caching album metadata.
//!
//! The registry provides:
//! - Lazy discovery of albums by name across the tier directories
//! - A process-lifetime cache of the resulting [`AlbumInfo`]
//! - Singleflight so concurrent first lookups of a name share one discovery
//! - Whole-cache invalidation, the only way cached data is ever dropped
//!
//! # Example
//!
//! ```ignore
//! use album_server::album::{AlbumRegistry, LocalFilesystem};
//!
//! let registry = AlbumRegistry::new(LocalFilesystem::new(), "/srv/albums");
//!
//! // Discovers and caches on first access
//! let album = registry.resolve("summer", None).await?;
//!
//! // Served from cache until invalidate_all()
//! let again = registry.resolve("summer", None).await?;
//! assert!(Arc::ptr_eq(&album, &again));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AlbumError, ProbeError};

use super::info::{
    is_ignored_entry, AlbumInfo, Tier, DISPLAY_DIR, HOUSEKEEPING_ENTRIES, META_DIR, PASSWORD_FILE,
    THUMBNAILS_DIR,
};
use super::probe::FilesystemProbe;

// =============================================================================
// AlbumRegistry
// =============================================================================

/// Registry of album metadata keyed by album name.
///
/// Entries are built on first lookup and then returned unchanged, even if the
/// directory changes on disk, until [`invalidate_all`](Self::invalidate_all).
pub struct AlbumRegistry<P: FilesystemProbe> {
    /// Filesystem access
    probe: P,

    /// Album root containing the tier directories
    root: PathBuf,

    /// Cached albums indexed by name
    cache: RwLock<HashMap<String, Arc<AlbumInfo>>>,

    /// In-flight discoveries for singleflight
    in_flight: InFlightMap,

    /// Bumped on every invalidation; discoveries started under an older
    /// generation are not written back to the cache
    generation: AtomicU64,
}

type InFlightMap = Mutex<HashMap<String, Arc<InFlightState>>>;

/// State for an in-flight discovery.
struct InFlightState {
    /// Notification for waiters
    notify: Notify,
    /// Result of the discovery (set when complete)
    result: Mutex<Option<Result<Arc<AlbumInfo>, AlbumError>>>,
    /// Set once the leader is gone, with or without a result
    finished: AtomicBool,
}

impl InFlightState {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: Mutex::new(None),
            finished: AtomicBool::new(false),
        }
    }

    fn result(&self) -> Option<Result<Arc<AlbumInfo>, AlbumError>> {
        lock(&self.result).clone()
    }

    fn set_result(&self, result: Result<Arc<AlbumInfo>, AlbumError>) {
        *lock(&self.result) = Some(result);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Releases the leader's in-flight slot when discovery ends, including when
/// the leading future is dropped before finishing.
struct LeaderGuard<'a> {
    in_flight: &'a InFlightMap,
    name: &'a str,
    state: Arc<InFlightState>,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(self.name);
        self.state.finished.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }
}

/// Lock a std mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<P: FilesystemProbe> AlbumRegistry<P> {
    /// Create a registry over `root`, which must contain the tier directories.
    pub fn new(probe: P, root: impl Into<PathBuf>) -> Self {
        Self {
            probe,
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Resolve an album by name.
    ///
    /// A cached entry is returned as-is. Otherwise the tier directories are
    /// probed in order (public, protected, private, hidden), or only
    /// `tier_hint` when given, and the first match is discovered and cached.
    ///
    /// Concurrent lookups of one name share a single discovery. If the task
    /// running it is dropped midway, a waiting lookup takes over.
    pub async fn resolve(
        &self,
        name: &str,
        tier_hint: Option<Tier>,
    ) -> Result<Arc<AlbumInfo>, AlbumError> {
        validate_album_name(name)?;

        // Fast path: check cache
        if let Some(album) = self.cached(name).await {
            return Ok(album);
        }

        // Slow path: wait on an in-flight discovery or become leader
        loop {
            let (state, leader) = {
                let mut in_flight = lock(&self.in_flight);
                match in_flight.get(name) {
                    Some(state) => (state.clone(), false),
                    None => {
                        let state = Arc::new(InFlightState::new());
                        in_flight.insert(name.to_string(), state.clone());
                        (state, true)
                    }
                }
            };

            if leader {
                return self.lead(name, tier_hint, state).await;
            }

            // Register interest before checking, so a leader finishing in
            // between cannot be missed
            let notified = state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = state.result() {
                return result;
            }
            if !state.is_finished() {
                notified.await;
            }
            if let Some(result) = state.result() {
                return result;
            }

            debug!(album = name, "Discovery leader was cancelled, retrying");
        }
    }

    /// Run the discovery for `name` as the singleflight leader.
    async fn lead(
        &self,
        name: &str,
        tier_hint: Option<Tier>,
        state: Arc<InFlightState>,
    ) -> Result<Arc<AlbumInfo>, AlbumError> {
        let _guard = LeaderGuard {
            in_flight: &self.in_flight,
            name,
            state: state.clone(),
        };

        // A previous leader may have finished between the fast path and here
        if let Some(album) = self.cached(name).await {
            state.set_result(Ok(album.clone()));
            return Ok(album);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let result = self.discover(name, tier_hint).await.map(Arc::new);

        if let Ok(ref album) = result {
            let mut cache = self.cache.write().await;
            if self.generation.load(Ordering::SeqCst) == generation {
                cache.insert(name.to_string(), album.clone());
            } else {
                debug!(album = name, "Registry invalidated during discovery, not caching");
            }
        }

        state.set_result(result.clone());
        result
    }

    /// Enumerate every album under `tiers`, newest first.
    ///
    /// Albums are discovered straight from the tier directories, going
    /// through [`resolve`](Self::resolve) so the cache is populated (and
    /// already cached entries are reused). Albums with equal creation times
    /// keep directory listing order.
    pub async fn list_by_tiers(&self, tiers: &[Tier]) -> Vec<Arc<AlbumInfo>> {
        let mut albums: Vec<Arc<AlbumInfo>> = Vec::new();

        for &tier in tiers {
            let tier_dir = self.root.join(tier.dir_name());
            let entries = match self.probe.list_entries(&tier_dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(tier = %tier, "Cannot list tier directory: {}", e);
                    continue;
                }
            };

            for entry in entries {
                if entry.starts_with('.') || HOUSEKEEPING_ENTRIES.contains(&entry.as_str()) {
                    continue;
                }
                if !self.probe.is_directory(&tier_dir.join(&entry)).await {
                    continue;
                }
                if albums.iter().any(|a| a.name == entry) {
                    continue;
                }

                match self.resolve(&entry, Some(tier)).await {
                    Ok(album) => albums.push(album),
                    Err(e) => warn!(album = %entry, "Skipping album: {}", e),
                }
            }
        }

        // Stable sort keeps listing order for ties
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        albums
    }

    /// Discard every cached album. Subsequent lookups rediscover from disk.
    pub async fn invalidate_all(&self) {
        let mut cache = self.cache.write().await;
        let dropped = cache.len();
        cache.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!(dropped, "Album registry invalidated");
    }

    /// Get the number of cached albums.
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// The probe used for filesystem access.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// The album root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn cached(&self, name: &str) -> Option<Arc<AlbumInfo>> {
        self.cache.read().await.get(name).cloned()
    }

    /// Discover an album from disk without touching the cache.
    async fn discover(&self, name: &str, tier_hint: Option<Tier>) -> Result<AlbumInfo, AlbumError> {
        let candidates: &[Tier] = match tier_hint {
            Some(ref tier) => std::slice::from_ref(tier),
            None => &Tier::ALL,
        };

        let mut found = None;
        for &tier in candidates {
            let dir = self.root.join(tier.dir_name()).join(name);
            if self.probe.is_directory(&dir).await {
                found = Some((tier, dir));
                break;
            }
        }

        let (tier, directory) = found.ok_or_else(|| AlbumError::NotFound {
            name: name.to_string(),
        })?;

        let discovery = |source: ProbeError| AlbumError::Discovery {
            name: name.to_string(),
            source,
        };

        let created_at = self
            .probe
            .creation_time(&directory)
            .await
            .map_err(discovery)?;

        for subdir in [THUMBNAILS_DIR, DISPLAY_DIR, META_DIR] {
            self.probe
                .ensure_directory(&directory.join(subdir))
                .await
                .map_err(discovery)?;
        }

        let password = if tier.requires_password() {
            let path = directory.join(PASSWORD_FILE);
            if self.probe.exists(&path).await {
                let raw = self.probe.read_to_string(&path).await.map_err(discovery)?;
                Some(raw.trim().to_string())
            } else {
                warn!(album = name, tier = %tier, "Album has no password file and cannot be unlocked");
                None
            }
        } else {
            None
        };

        // Entries come back sorted from the probe; sort again so the
        // ordering contract does not depend on the probe implementation
        let mut photos: Vec<String> = self
            .probe
            .list_entries(&directory)
            .await
            .map_err(discovery)?
            .into_iter()
            .filter(|entry| !is_ignored_entry(entry))
            .collect();
        photos.sort();

        info!(
            album = name,
            tier = %tier,
            photos = photos.len(),
            "Discovered album"
        );

        Ok(AlbumInfo {
            name: name.to_string(),
            tier,
            directory,
            created_at,
            password,
            photos,
        })
    }
}

/// Reject names that cannot be a single directory under a tier.
fn validate_album_name(name: &str) -> Result<(), AlbumError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");

    if invalid {
        Err(AlbumError::InvalidName {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

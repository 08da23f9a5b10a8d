//! Password-checked, throttled invalidation of the album registry.
//!
//! Only one refresh attempt may be outstanding at a time. A wrong secret
//! holds the gate for a fixed delay before answering, which slows down
//! guessing; every attempt arriving meanwhile is answered with
//! [`RefreshOutcome::Busy`] without being checked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use super::probe::FilesystemProbe;
use super::registry::AlbumRegistry;

/// Default time a rejected attempt holds the gate.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Result of a refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Secret matched and the registry was invalidated
    Accepted,
    /// Secret did not match (answered after the throttle delay)
    Rejected,
    /// Another attempt is outstanding; this one was not checked
    Busy,
}

/// Throttled gate in front of [`AlbumRegistry::invalidate_all`].
pub struct RefreshGate<P: FilesystemProbe> {
    registry: Arc<AlbumRegistry<P>>,
    secret: String,
    delay: Duration,
    occupied: Arc<AtomicBool>,
}

impl<P: FilesystemProbe> RefreshGate<P> {
    /// Create a gate with the default one second throttle.
    pub fn new(registry: Arc<AlbumRegistry<P>>, secret: impl Into<String>) -> Self {
        Self::with_delay(registry, secret, DEFAULT_REFRESH_DELAY)
    }

    /// Create a gate with a custom throttle delay.
    pub fn with_delay(
        registry: Arc<AlbumRegistry<P>>,
        secret: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            registry,
            secret: secret.into(),
            delay,
            occupied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attempt to invalidate the registry with `provided` as the secret.
    ///
    /// The throttle delay runs on its own task, so dropping this future
    /// (e.g. the client disconnecting) does not release the gate early.
    pub async fn request_invalidation(&self, provided: &str) -> RefreshOutcome {
        if self
            .occupied
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Refresh attempt while gate is occupied");
            return RefreshOutcome::Busy;
        }

        if bool::from(provided.as_bytes().ct_eq(self.secret.as_bytes())) {
            self.registry.invalidate_all().await;
            self.occupied.store(false, Ordering::SeqCst);
            info!("Refresh accepted");
            return RefreshOutcome::Accepted;
        }

        warn!(delay_ms = self.delay.as_millis() as u64, "Refresh rejected: wrong password");

        let occupied = Arc::clone(&self.occupied);
        let delay = self.delay;
        let release = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            occupied.store(false, Ordering::SeqCst);
        });
        // Sleep never panics; a join error can only mean runtime shutdown
        let _ = release.await;

        RefreshOutcome::Rejected
    }

    /// Whether an attempt is currently holding the gate.
    pub fn is_busy(&self) -> bool {
        self.occupied.load(Ordering::SeqCst)
    }
}

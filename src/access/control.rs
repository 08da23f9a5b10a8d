//! Tier-based access rules.
//!
//! Decides whether a session may view an album and records or clears the
//! album passwords a visitor has entered. The rules read and write a
//! [`Session`] value; storing it is up to [`SessionStore`](super::SessionStore).

use tracing::debug;

use crate::album::AlbumInfo;

use super::session::Session;

/// Authorization decision for viewing an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// The visitor must enter the album password first
    RequiresPassword,
}

/// Tier-based access rules for albums.
///
/// Public and hidden albums are always readable. Protected and private albums
/// are readable once the session holds the album's current password.
///
/// Album passwords are shared plaintext passphrases compared with plain
/// equality, and the entered password is kept in the session so that
/// changing the password file (followed by a refresh) locks out existing
/// sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessControl;

impl AccessControl {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `session` may view `album`.
    pub fn authorize(&self, session: &Session, album: &AlbumInfo) -> Access {
        if !album.tier.requires_password() {
            return Access::Allowed;
        }

        match (&album.password, session.passwords.get(&album.name)) {
            (Some(expected), Some(entered)) if expected == entered => Access::Allowed,
            _ => Access::RequiresPassword,
        }
    }

    /// Whether `password` unlocks `album`. Albums without a password file
    /// can never be unlocked.
    pub fn check_password(&self, album: &AlbumInfo, password: &str) -> bool {
        album.password.as_deref() == Some(password)
    }

    /// Remember a verified password for `album` in the session.
    pub fn record_success(&self, session: &mut Session, album: &AlbumInfo, password: &str) {
        debug!(album = %album.name, "Recording album password in session");
        session
            .passwords
            .insert(album.name.clone(), password.to_string());
    }

    /// Drop every password held by the session.
    pub fn forget(&self, session: &mut Session) {
        session.passwords.clear();
    }
}

//! In-memory session store.
//!
//! Sessions are keyed by an opaque random id carried in a cookie. The only
//! state the gallery keeps per session is the map of album passwords the
//! visitor has entered.
//!
//! Sessions idle for longer than the store's timeout are treated as gone and
//! are pruned whenever a session is written.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Default idle time after which a session is forgotten (30 days).
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Per-visitor state that survives across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Album name -> password the visitor entered for it
    pub passwords: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the visitor has unlocked any album in this session.
    pub fn has_passwords(&self) -> bool {
        !self.passwords.is_empty()
    }
}

struct Entry {
    session: Session,
    last_seen: Instant,
}

impl Entry {
    fn new(session: Session) -> Self {
        Self {
            session,
            last_seen: Instant::now(),
        }
    }
}

/// Process-local store of sessions keyed by session id.
///
/// Writes go through [`update`](Self::update) and
/// [`update_existing`](Self::update_existing), which mutate the stored
/// session under the store's write lock, so concurrent requests from one
/// visitor cannot overwrite each other's changes.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Snapshot of the session with this id, if it exists and has not
    /// expired. Loading counts as activity.
    pub async fn load(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        if entry.last_seen.elapsed() >= self.idle_timeout {
            sessions.remove(id);
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Store `session` under `id`, or under a fresh id when `id` is `None`
    /// or unknown. Returns the id the session was saved under.
    pub async fn save(&self, id: Option<&str>, session: Session) -> String {
        self.update(id, |stored| *stored = session).await
    }

    /// Apply `f` to the session with this id, creating a fresh session under
    /// a new id when `id` is `None`, unknown or expired. Returns the id the
    /// session lives under.
    pub async fn update<F>(&self, id: Option<&str>, f: F) -> String
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions);

        let id = match id {
            Some(id) if sessions.contains_key(id) => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let entry = sessions
            .entry(id.clone())
            .or_insert_with(|| Entry::new(Session::new()));
        f(&mut entry.session);
        entry.last_seen = Instant::now();
        id
    }

    /// Apply `f` to an existing, unexpired session. Returns `false` (and
    /// creates nothing) when there is no such session.
    pub async fn update_existing<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions);

        match sessions.get_mut(id) {
            Some(entry) => {
                f(&mut entry.session);
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|entry| entry.last_seen.elapsed() < self.idle_timeout)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn prune(&self, sessions: &mut HashMap<String, Entry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "Pruned idle sessions");
        }
    }
}

//! Album access control and visitor sessions.

mod control;
mod session;

pub use control::{Access, AccessControl};
pub use session::{Session, SessionStore, DEFAULT_SESSION_IDLE_TIMEOUT};

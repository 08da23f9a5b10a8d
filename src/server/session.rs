//! Session cookie handling.
//!
//! The visitor's session id travels in the `gallery_session` cookie. Ids are
//! issued by [`SessionStore`](crate::access::SessionStore) the first time a
//! password is recorded; requests without the cookie simply get an empty
//! session.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "gallery_session";

/// Session id presented by the client, if any.
///
/// Never rejects: a missing or malformed cookie yields `SessionId(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionId(pub Option<String>);

impl SessionId {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| cookie_value(cookies, SESSION_COOKIE));

        Ok(SessionId(id))
    }
}

/// Find `name` in a `Cookie` header value.
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// `Set-Cookie` value that stores `id` for the whole site.
pub fn session_cookie(id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, id
    ))
    .ok()
}

/// Restrict a post-login redirect to a path on this site.
///
/// Anything that is not an absolute path (including protocol-relative
/// `//host` forms) falls back to `/`.
pub fn safe_redirect(target: Option<&str>) -> &str {
    match target {
        Some(target)
            if target.starts_with('/')
                && !target.starts_with("//")
                && !target.contains('\\') =>
        {
            target
        }
        _ => "/",
    }
}

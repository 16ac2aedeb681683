//! Browser-ambient state behind explicit collaborator traits. The session flow
//! never reads the address bar or the cookie jar directly; it goes through a
//! [`LocationAccessor`] and a [`CookieStore`], which keeps the bootstrap logic
//! testable and lets the CLI run it against an on-disk jar.
//!
//! Cookie values include the session-initiation token and the bearer
//! credential; implementations must not log them.

mod cookies;
mod location;

pub use cookies::{CookieExpiry, CookieJar, CookieJarError, CookieStore};
pub use location::{LocationAccessor, StaticLocation};

/// Cookie holding a session-initiation token handed over by a redirect.
pub const JWT_COOKIE: &str = "idsite_jwt";
/// Cookie holding the rotating bearer credential (session-scoped).
pub const SESSION_COOKIE: &str = "idsite_session";
/// Cookie holding the last organization name key (persistent).
pub const ORGANIZATION_NAME_KEY_COOKIE: &str = "idsite_organization_name_key";

/// Reads the organization name key cached by an earlier session, if any.
#[must_use]
pub fn cached_organization_name_key(cookies: &dyn CookieStore) -> Option<String> {
    cookies
        .get(ORGANIZATION_NAME_KEY_COOKIE)
        .filter(|value| !value.is_empty())
}

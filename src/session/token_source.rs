//! Locates the session-initiation token. The token is consumed on read: it is
//! stripped from the address bar or cleared from the cookie jar so it cannot be
//! replayed or left exposed after first use.

use crate::browser::{CookieStore, LocationAccessor, JWT_COOKIE};
use std::sync::Arc;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

const JWT_QUERY_PARAM: &str = "jwt";

pub struct TokenSource {
    location: Arc<dyn LocationAccessor>,
    cookies: Arc<dyn CookieStore>,
}

impl TokenSource {
    #[must_use]
    pub fn new(location: Arc<dyn LocationAccessor>, cookies: Arc<dyn CookieStore>) -> Self {
        Self { location, cookies }
    }

    /// Returns the token from the `jwt=` query parameter, else from the
    /// session cookie, else `None`. The cookie is untouched when the URL wins.
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        if let Some(token) = self.take_from_location() {
            debug!("session-initiation token taken from location");
            return Some(token);
        }

        let token = self.cookies.get(JWT_COOKIE)?;
        self.cookies.remove(JWT_COOKIE);
        if token.is_empty() {
            return None;
        }
        debug!("session-initiation token taken from cookie");
        Some(token)
    }

    fn take_from_location(&self) -> Option<String> {
        let href = self.location.href();
        let mut url = match Url::parse(&href) {
            Ok(url) => url,
            Err(err) => {
                warn!("current location is not a valid URL: {err}");
                return None;
            }
        };

        // Other parameters keep their original encoding.
        let mut token = None;
        let mut remaining = Vec::new();
        for segment in url.query().unwrap_or_default().split('&') {
            match form_urlencoded::parse(segment.as_bytes()).next() {
                Some((key, value)) if key == JWT_QUERY_PARAM => {
                    if token.is_none() {
                        token = Some(value.into_owned());
                    }
                }
                Some(_) => remaining.push(segment),
                None => {}
            }
        }
        let token = token?;

        let query = remaining.join("&");
        url.set_query((!query.is_empty()).then_some(query.as_str()));
        self.location.replace(url.as_str());

        Some(token).filter(|token| !token.is_empty())
    }
}

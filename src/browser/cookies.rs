use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::Path,
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use tracing::debug;

/// How long a cookie outlives the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieExpiry {
    /// No explicit expiry; dropped when the browser session ends.
    Session,
    /// Far-future expiry; survives browser restarts.
    Persistent,
}

/// Get/set/clear contract for cookie storage shared with the browser.
/// Writes are last-write-wins.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str, expiry: CookieExpiry);
    fn remove(&self, name: &str);
}

#[derive(Debug, Error)]
pub enum CookieJarError {
    #[error("failed to access cookie jar: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cookie jar contents")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct StoredCookie {
    value: String,
    expiry: CookieExpiry,
}

/// In-memory cookie store that can be loaded from and saved to a JSON file.
///
/// Loading a jar drops session-scoped cookies, the same way a browser does on
/// restart.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a jar from `path`. A missing file yields an empty jar.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid jar.
    pub fn load(path: &Path) -> Result<Self, CookieJarError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("cookie jar {} not found, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(err) => return Err(err.into()),
        };

        let stored: BTreeMap<String, StoredCookie> = serde_json::from_str(&contents)?;
        let cookies = stored
            .into_iter()
            .filter(|(_, cookie)| cookie.expiry == CookieExpiry::Persistent)
            .collect();

        Ok(Self {
            cookies: Mutex::new(cookies),
        })
    }

    /// Writes every cookie, session-scoped ones included, to `path`.
    ///
    /// # Errors
    /// Returns an error if the jar cannot be encoded or written.
    pub fn save(&self, path: &Path) -> Result<(), CookieJarError> {
        let contents = {
            let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&*cookies)?
        };
        fs::write(path, contents)?;
        Ok(())
    }
}

impl CookieStore for CookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|cookie| cookie.value.clone())
    }

    fn set(&self, name: &str, value: &str, expiry: CookieExpiry) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                StoredCookie {
                    value: value.to_string(),
                    expiry,
                },
            );
    }

    fn remove(&self, name: &str) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

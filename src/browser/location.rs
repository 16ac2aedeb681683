use std::sync::{Mutex, PoisonError};

/// Read/replace access to the current page address.
pub trait LocationAccessor: Send + Sync {
    fn href(&self) -> String;
    /// Replaces the address in place, without adding a history entry.
    fn replace(&self, href: &str);
}

/// A location held in memory, used outside the browser and in tests.
#[derive(Debug, Default)]
pub struct StaticLocation {
    href: Mutex<String>,
}

impl StaticLocation {
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Mutex::new(href.into()),
        }
    }
}

impl LocationAccessor for StaticLocation {
    fn href(&self) -> String {
        self.href
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, href: &str) {
        *self.href.lock().unwrap_or_else(PoisonError::into_inner) = href.to_string();
    }
}

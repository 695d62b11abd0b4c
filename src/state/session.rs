//! Tab-scoped session persistence.
//!
//! ARCHITECTURE
//! ============
//! [`SessionStore`] owns two storage entries: the `isLoggedIn` flag and the
//! `userSession` JSON record. Callers never touch the entries directly, so the
//! store is the only place where the two can be written or cleared, and both
//! are always cleared together.
//!
//! The storage medium is a [`SessionStorage`] trait object. Browser builds
//! (`hydrate`) use `window.sessionStorage`; native builds and tests use
//! [`MemoryStorage`], which lives exactly as long as the process.
//!
//! "Logged in" is derived from both entries. A flag without a usable record
//! never reads as logged in.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Mutex, PoisonError};

use crate::net::types::Session;

pub const LOGGED_IN_KEY: &str = "isLoggedIn";
pub const SESSION_KEY: &str = "userSession";

/// Errors raised when the storage medium rejects a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The browser storage area is not available (no window, disabled, etc.).
    #[error("session storage unavailable")]
    Unavailable,

    /// The medium refused the write (quota exceeded, private mode, ...).
    #[error("session storage write failed: {0}")]
    Write(String),

    /// The session record could not be serialized.
    #[error("session encode failed: {0}")]
    Encode(String),
}

/// Synchronous string key/value storage.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str);

    /// Remove several keys as one step. Backends with a lock override this
    /// so no reader can observe a partially removed set.
    fn remove_items(&self, keys: &[&str]) {
        for key in keys {
            self.remove_item(key);
        }
    }
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

/// Process-lifetime storage for native builds and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.entries().remove(key);
    }

    fn remove_items(&self, keys: &[&str]) {
        let mut entries = self.entries();
        for key in keys {
            entries.remove(*key);
        }
    }
}

// =============================================================================
// BROWSER BACKEND
// =============================================================================

/// `window.sessionStorage`, scoped to the current tab.
#[cfg(feature = "hydrate")]
pub struct BrowserSessionStorage {
    storage: web_sys::Storage,
}

#[cfg(feature = "hydrate")]
impl BrowserSessionStorage {
    /// Open the tab's session storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] outside a browser window or when
    /// storage access is blocked.
    pub fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .and_then(|w| w.session_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

#[cfg(feature = "hydrate")]
impl SessionStorage for BrowserSessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Write(format!("{e:?}")))
    }

    fn remove_item(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            tracing::warn!(key, error = ?e, "session storage remove failed");
        }
    }
}

// =============================================================================
// SESSION STORE
// =============================================================================

/// Owner of the persisted session for one tab.
///
/// Cheap to clone; clones share the same storage medium.
#[derive(Clone)]
pub struct SessionStore {
    storage: Rc<dyn SessionStorage>,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Rc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// A store backed by fresh [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStorage::new()))
    }

    /// A store backed by the tab's `sessionStorage`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if session storage cannot be opened.
    #[cfg(feature = "hydrate")]
    pub fn browser() -> Result<Self, StorageError> {
        Ok(Self::new(Rc::new(BrowserSessionStorage::open()?)))
    }

    /// Write or remove the logged-in flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    pub fn set_logged_in(&self, logged_in: bool) -> Result<(), StorageError> {
        if logged_in {
            self.storage.set_item(LOGGED_IN_KEY, "true")
        } else {
            self.storage.remove_item(LOGGED_IN_KEY);
            Ok(())
        }
    }

    /// `true` only when the flag is set and a session with an access token is stored.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.flag_set() && self.load_session().is_some_and(|s| s.has_access_token())
    }

    fn flag_set(&self) -> bool {
        self.storage.get_item(LOGGED_IN_KEY).as_deref() == Some("true")
    }

    /// Serialize and store the whole record, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let raw = serde_json::to_string(session)
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        self.storage.set_item(SESSION_KEY, &raw)
    }

    /// Load the stored record. Absent or malformed records yield `None`.
    #[must_use]
    pub fn load_session(&self) -> Option<Session> {
        let raw = self.storage.get_item(SESSION_KEY)?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed session record");
                None
            }
        }
    }

    /// Store a fresh session and raise the flag.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails. A rejected record write leaves
    /// the previous entries untouched. A rejected flag write after the record
    /// was replaced clears both, so a new record never sits under a stale flag.
    pub fn begin(&self, session: &Session) -> Result<(), StorageError> {
        self.save_session(session)?;
        self.set_logged_in(true).inspect_err(|_| self.clear())
    }

    /// Remove the flag and the record together.
    pub fn clear(&self) {
        self.storage.remove_items(&[LOGGED_IN_KEY, SESSION_KEY]);
    }
}

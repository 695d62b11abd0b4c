#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use super::session::SessionStore;
use crate::net::types::UserProfile;

/// Authentication state tracking the current user and loading status.
///
/// Front ends hold it in an `RwSignal` provided via context; `loading` stays
/// `true` until the stored session has been read once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub loading: bool,
}

impl AuthState {
    /// State before the session has been read.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    /// Snapshot the store. The user is only exposed while the session reads
    /// as logged in.
    #[must_use]
    pub fn from_store(store: &SessionStore) -> Self {
        let user = if store.is_logged_in() {
            store.load_session().map(|s| s.user)
        } else {
            None
        };
        Self {
            user,
            loading: false,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

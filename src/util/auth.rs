//! Protected-route gate.
//!
//! [`can_enter_protected`] is the pure decision every protected view consults
//! before rendering. [`install_unauth_redirect`] wires the same rule into a
//! Leptos effect so a page navigates to login as soon as the session is gone.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;

use crate::state::auth::AuthState;
use crate::state::session::SessionStore;

/// Client route of the login page.
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
}

impl RouteDecision {
    /// Where to navigate instead of rendering, if anywhere.
    #[must_use]
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin => Some(LOGIN_ROUTE),
        }
    }
}

/// Allow iff the store reads as logged in. Reads only.
#[must_use]
pub fn can_enter_protected(store: &SessionStore) -> RouteDecision {
    if store.is_logged_in() {
        RouteDecision::Allow
    } else {
        tracing::debug!("protected route blocked: not logged in");
        RouteDecision::RedirectToLogin
    }
}

/// Redirect once the session has been read and no user is present.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

/// Navigate to login whenever `auth` settles without a user.
pub fn install_unauth_redirect<F>(auth: RwSignal<AuthState>, navigate: F)
where
    F: Fn(&str, NavigateOptions) + 'static,
{
    Effect::new(move || {
        let state = auth.get();
        if should_redirect_unauth(&state) {
            navigate(LOGIN_ROUTE, NavigateOptions::default());
        }
    });
}

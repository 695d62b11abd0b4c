//! Authenticated HTTP client with one-shot token refresh.
//!
//! ARCHITECTURE
//! ============
//! Every authenticated call goes through [`AuthClient::fetch_with_auth`]. The
//! client attaches the session's refresh token as the `x-token` header (the
//! backend authenticates requests with that token) and, when the server
//! answers 401, performs exactly one refresh followed by exactly one retry of
//! the original request.
//!
//! SESSION LIFECYCLE
//! =================
//! ```text
//! LoggedOut --login ok--> Active --401--> Expiring --refresh ok--> Active
//!                                            |
//!                                            +--refresh failed--> LoggedOut
//! Active/Expiring --logout--> LoggedOut
//! ```
//!
//! `Expiring` holds while at least one refresh is in flight, so overlapping
//! refreshes keep the phase until the last one settles.
//!
//! ERROR HANDLING
//! ==============
//! A failed refresh is terminal for the session: the store is cleared and the
//! original 401 is handed back so the caller can send the user to login.
//! Transport errors propagate; nothing is retried more than once.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::cell::Cell;

use super::http::{
    HttpRequest, HttpResponse, HttpTransport, Method, RequestOptions, TransportError,
};
use super::types::{RefreshRequest, Session};
use crate::state::session::{SessionStore, StorageError};

/// Header carrying the per-request credential.
pub const AUTH_HEADER: &str = "x-token";

/// Observable position in the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    LoggedOut,
    /// Logged in with a token the server has not rejected yet.
    Active,
    /// Logged in, a request came back 401 and a refresh is in flight.
    Expiring,
}

/// Login and refresh endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login_url: String,
    pub refresh_url: String,
}

/// Errors returned by [`AuthClient::fetch_with_auth`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// An authenticated call was made while no session is stored.
    #[error("no refresh token found; authenticated request issued while logged out")]
    MissingRefreshToken,

    /// The request never completed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Reasons a refresh attempt is abandoned. Only logged; callers see `false`.
#[derive(Debug, thiserror::Error)]
enum RefreshError {
    #[error("refresh rejected with status {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("refresh body invalid: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("refreshed session has no access token")]
    EmptyAccessToken,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counts one in-flight refresh; released even if the refresh future is dropped.
struct ExpiringGuard<'a>(&'a Cell<usize>);

impl<'a> ExpiringGuard<'a> {
    fn enter(in_flight: &'a Cell<usize>) -> Self {
        in_flight.set(in_flight.get() + 1);
        Self(in_flight)
    }
}

impl Drop for ExpiringGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Session-aware HTTP client shared by the login flow and all API helpers.
pub struct AuthClient<T> {
    transport: T,
    store: SessionStore,
    endpoints: AuthEndpoints,
    /// Refreshes currently awaiting the server.
    refreshing: Cell<usize>,
}

impl<T: HttpTransport> AuthClient<T> {
    #[must_use]
    pub fn new(transport: T, store: SessionStore, endpoints: AuthEndpoints) -> Self {
        Self {
            transport,
            store,
            endpoints,
            refreshing: Cell::new(0),
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.store
            .load_session()
            .map(|s| s.access_token)
            .filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.store
            .load_session()
            .map(|s| s.refresh_token)
            .filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if !self.store.is_logged_in() {
            SessionPhase::LoggedOut
        } else if self.refreshing.get() > 0 {
            SessionPhase::Expiring
        } else {
            SessionPhase::Active
        }
    }

    /// Explicit logout: drop the stored session.
    pub fn logout(&self) {
        self.store.clear();
        tracing::info!("session cleared by logout");
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// Returns `false` without a request when no refresh token is stored. Any
    /// failure clears the session and returns `false`; the refresh itself is
    /// never retried.
    pub async fn refresh(&self) -> bool {
        let Some(refresh_token) = self.refresh_token() else {
            tracing::debug!("refresh skipped: no refresh token stored");
            return false;
        };

        let outcome = {
            let _expiring = ExpiringGuard::enter(&self.refreshing);
            self.request_refresh(&refresh_token).await
        };

        match outcome {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "session refreshed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; clearing session");
                self.store.clear();
                false
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<Session, RefreshError> {
        let options = RequestOptions::new(Method::Post)
            .json(&RefreshRequest { refresh_token })?;
        let response = self
            .transport
            .send(HttpRequest::new(&self.endpoints.refresh_url, options))
            .await?;
        if !response.ok() {
            return Err(RefreshError::Status(response.status));
        }
        let session: Session = response.json()?;
        if !session.has_access_token() {
            return Err(RefreshError::EmptyAccessToken);
        }
        self.store.begin(&session)?;
        Ok(session)
    }

    /// Issue `options` against `url` with the session credential attached.
    ///
    /// On 401 the session is refreshed once and the original request reissued
    /// once with the rotated token. If the refresh fails, the original 401 is
    /// returned unchanged. At most two requests reach the network.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingRefreshToken`] if called while logged out (no
    ///   request is sent).
    /// - [`AuthError::Transport`] if an attempt never completed.
    pub async fn fetch_with_auth(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, AuthError> {
        let token = self.refresh_token().ok_or(AuthError::MissingRefreshToken)?;

        let response = self
            .transport
            .send(authorized(url, &options, &token))
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    url,
                    method = options.method.as_str(),
                    error = %e,
                    "authenticated request failed"
                );
            })?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        tracing::info!(url, "request unauthorized; attempting session refresh");
        if !self.refresh().await {
            return Ok(response);
        }

        let token = self.refresh_token().ok_or(AuthError::MissingRefreshToken)?;
        let retried = self
            .transport
            .send(authorized(url, &options, &token))
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    url,
                    method = options.method.as_str(),
                    error = %e,
                    "retried request failed"
                );
            })?;
        tracing::debug!(url, status = retried.status, "retried request completed");
        Ok(retried)
    }
}

fn authorized(url: &str, options: &RequestOptions, token: &str) -> HttpRequest {
    HttpRequest::new(url, options.clone().header(AUTH_HEADER, token))
}

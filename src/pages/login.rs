//! Login submission.
//!
//! DESIGN
//! ======
//! [`LoginFlow::submit`] posts credentials to the login endpoint and, on
//! success, hands the returned session to the store. A rejected or failed
//! exchange never touches the stored session, so an already logged-in tab
//! stays logged in. Storage is the one exception: if the new record was
//! written but the logged-in flag could not be, the store is cleared rather
//! than left half-updated.
//! One submission may be in flight at a time; a second call while the first is
//! pending is refused without a request.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use std::cell::Cell;

use crate::net::api::server_message;
use crate::net::auth::AuthClient;
use crate::net::http::{HttpRequest, HttpTransport, Method, RequestOptions, TransportError};
use crate::net::types::{Credentials, Session};
use crate::state::session::StorageError;

/// Shown when the server rejects a login without saying why.
pub const GENERIC_LOGIN_ERROR: &str = "Error al iniciar sesión";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// Rejected locally before any request.
    #[error("{0}")]
    Invalid(&'static str),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("a login request is already in flight")]
    AlreadySubmitting,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("login request encode failed: {0}")]
    Encode(String),

    #[error("login response malformed: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// FORM RULES
// =============================================================================

/// Form-level checks applied by the login page before submitting.
///
/// # Errors
///
/// Returns [`LoginError::Invalid`] with the message for the first failed rule.
pub fn validate_login_form(username: &str, password: &str) -> Result<(), LoginError> {
    if username.is_empty() {
        return Err(LoginError::Invalid("El nombre de usuario es obligatorio"));
    }
    if username.chars().count() < 5 {
        return Err(LoginError::Invalid(
            "El nombre de usuario debe tener al menos 5 caracteres",
        ));
    }
    if !username.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(LoginError::Invalid(
            "El nombre de usuario solo puede contener letras minúsculas",
        ));
    }
    if password.is_empty() {
        return Err(LoginError::Invalid("La contraseña es obligatoria"));
    }
    if password.chars().count() < 6 {
        return Err(LoginError::Invalid(
            "La contraseña debe tener al menos 6 caracteres",
        ));
    }
    Ok(())
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// Clears the in-flight latch when a submission ends or is dropped.
struct SubmitGuard<'a>(&'a Cell<bool>);

impl<'a> SubmitGuard<'a> {
    fn acquire(latch: &'a Cell<bool>) -> Option<Self> {
        if latch.replace(true) {
            return None;
        }
        Some(Self(latch))
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct LoginFlow<'a, T> {
    auth: &'a AuthClient<T>,
    submitting: Cell<bool>,
}

impl<'a, T: HttpTransport> LoginFlow<'a, T> {
    #[must_use]
    pub fn new(auth: &'a AuthClient<T>) -> Self {
        Self {
            auth,
            submitting: Cell::new(false),
        }
    }

    /// `true` while a submission is awaiting the server.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// Log in with `credentials` and store the resulting session.
    ///
    /// # Errors
    ///
    /// - [`LoginError::Invalid`] for an empty identifier or password.
    /// - [`LoginError::AlreadySubmitting`] if another submit is pending.
    /// - [`LoginError::Rejected`] for a non-2xx answer, carrying the server's
    ///   message or [`GENERIC_LOGIN_ERROR`].
    /// - [`LoginError::Transport`], [`LoginError::MalformedResponse`] or
    ///   [`LoginError::Storage`] if the exchange cannot be completed.
    ///
    /// On success the stored session is returned for display.
    pub async fn submit(&self, credentials: &Credentials) -> Result<Session, LoginError> {
        if credentials.identifier.value().trim().is_empty() {
            return Err(LoginError::Invalid("El nombre de usuario es obligatorio"));
        }
        if credentials.password.is_empty() {
            return Err(LoginError::Invalid("La contraseña es obligatoria"));
        }
        let Some(_latch) = SubmitGuard::acquire(&self.submitting) else {
            tracing::debug!("login submit ignored: already in flight");
            return Err(LoginError::AlreadySubmitting);
        };

        let options = RequestOptions::new(Method::Post)
            .json(credentials)
            .map_err(|e| LoginError::Encode(e.to_string()))?;
        let url = &self.auth.endpoints().login_url;
        let response = self
            .auth
            .transport()
            .send(HttpRequest::new(url.as_str(), options))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "login request failed"))?;

        if !response.ok() {
            let message = server_message(&response)
                .unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_owned());
            tracing::info!(status = response.status, "login rejected");
            return Err(LoginError::Rejected {
                status: response.status,
                message,
            });
        }

        let session: Session = response
            .json()
            .map_err(|e| LoginError::MalformedResponse(e.to_string()))?;
        if !session.has_access_token() {
            return Err(LoginError::MalformedResponse(
                "missing access token".to_owned(),
            ));
        }
        self.auth.store().begin(&session)?;
        tracing::info!(user_id = %session.user.id, "logged in");
        Ok(session)
    }
}

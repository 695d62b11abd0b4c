//! REST helpers for the products and users collections.
//!
//! Reads are public and go straight to the transport; every mutation except
//! user registration goes through [`AuthClient::fetch_with_auth`] so it picks
//! up the session header and the refresh-and-retry behavior.
//!
//! ERROR HANDLING
//! ==============
//! List reads degrade to an empty list so a dashboard can still render.
//! Mutations hand back the raw [`HttpResponse`]; callers that want a typed
//! body use [`decode`], which turns non-2xx statuses into
//! [`ApiError::Status`] with the server's message when present.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde::de::DeserializeOwned;

use super::auth::{AuthClient, AuthError};
use super::http::{
    HttpRequest, HttpResponse, HttpTransport, Method, RequestOptions, TransportError,
};
use super::types::{ErrorBody, NewUser, Product, ProductDraft, User, UserPatch};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request body encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("response body decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Decode a successful JSON body, or report the failing status.
///
/// # Errors
///
/// Returns [`ApiError::Status`] for non-2xx responses and
/// [`ApiError::Decode`] for bodies that do not match `T`.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    ensure_ok(response)?;
    response.json().map_err(ApiError::Decode)
}

/// Turn a non-2xx response into [`ApiError::Status`].
///
/// # Errors
///
/// Returns [`ApiError::Status`] unless the status is 2xx.
pub fn ensure_ok(response: &HttpResponse) -> Result<(), ApiError> {
    if response.ok() {
        Ok(())
    } else {
        Err(status_error(response))
    }
}

pub(crate) fn status_error(response: &HttpResponse) -> ApiError {
    let message = server_message(response);
    ApiError::Status {
        status: response.status,
        message: message.unwrap_or_else(|| "request failed".to_owned()),
    }
}

/// The `{message}` field of an error body, if any.
pub(crate) fn server_message(response: &HttpResponse) -> Option<String> {
    response
        .json::<ErrorBody>()
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
}

fn item_url(collection: &str, id: &str) -> String {
    format!("{}/{}", collection.trim_end_matches('/'), id.trim())
}

async fn public_get<T: HttpTransport>(
    auth: &AuthClient<T>,
    url: &str,
) -> Result<HttpResponse, TransportError> {
    auth.transport()
        .send(HttpRequest::new(url, RequestOptions::default()))
        .await
}

async fn fetch_optional<T, R>(auth: &AuthClient<T>, url: &str) -> Result<Option<R>, ApiError>
where
    T: HttpTransport,
    R: DeserializeOwned,
{
    let response = public_get(auth, url).await?;
    if response.status == 404 {
        return Ok(None);
    }
    decode(&response).map(Some)
}

async fn fetch_list<T, R>(auth: &AuthClient<T>, url: &str, what: &'static str) -> Vec<R>
where
    T: HttpTransport,
    R: DeserializeOwned,
{
    let outcome = match public_get(auth, url).await {
        Ok(response) => decode::<Vec<R>>(&response),
        Err(e) => Err(e.into()),
    };
    outcome.unwrap_or_else(|e| {
        tracing::warn!(what, error = %e, "list fetch failed; showing empty list");
        Vec::new()
    })
}

// =============================================================================
// PRODUCTS
// =============================================================================

pub struct ProductsApi<'a, T> {
    auth: &'a AuthClient<T>,
    collection_url: &'a str,
}

impl<'a, T: HttpTransport> ProductsApi<'a, T> {
    #[must_use]
    pub fn new(auth: &'a AuthClient<T>, collection_url: &'a str) -> Self {
        Self {
            auth,
            collection_url,
        }
    }

    /// All products; empty on any failure.
    pub async fn list(&self) -> Vec<Product> {
        fetch_list(self.auth, self.collection_url, "products").await
    }

    /// One product, or `None` if the server does not know the id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx/404 status or bad body.
    pub async fn get(&self, id: &str) -> Result<Option<Product>, ApiError> {
        let url = item_url(self.collection_url, id);
        fetch_optional(self.auth, &url).await
    }

    /// `POST` a new product.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft cannot be encoded or the authenticated
    /// request fails before a response.
    pub async fn create(&self, draft: &ProductDraft) -> Result<HttpResponse, ApiError> {
        let options = RequestOptions::new(Method::Post)
            .json(draft)
            .map_err(ApiError::Encode)?;
        let response = self
            .auth
            .fetch_with_auth(self.collection_url, options)
            .await?;
        Ok(response)
    }

    /// `PUT` a full product replacement.
    ///
    /// # Errors
    ///
    /// Same as [`ProductsApi::create`].
    pub async fn update(&self, id: &str, product: &Product) -> Result<HttpResponse, ApiError> {
        let options = RequestOptions::new(Method::Put)
            .json(product)
            .map_err(ApiError::Encode)?;
        let url = item_url(self.collection_url, id);
        Ok(self.auth.fetch_with_auth(&url, options).await?)
    }

    /// `DELETE` a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the authenticated request fails before a response.
    pub async fn delete(&self, id: &str) -> Result<HttpResponse, ApiError> {
        let options = RequestOptions::new(Method::Delete);
        let url = item_url(self.collection_url, id);
        Ok(self.auth.fetch_with_auth(&url, options).await?)
    }
}

// =============================================================================
// USERS
// =============================================================================

pub struct UsersApi<'a, T> {
    auth: &'a AuthClient<T>,
    collection_url: &'a str,
}

impl<'a, T: HttpTransport> UsersApi<'a, T> {
    #[must_use]
    pub fn new(auth: &'a AuthClient<T>, collection_url: &'a str) -> Self {
        Self {
            auth,
            collection_url,
        }
    }

    /// All users; empty on any failure.
    pub async fn list(&self) -> Vec<User> {
        fetch_list(self.auth, self.collection_url, "users").await
    }

    /// One user, or `None` if the server does not know the id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx/404 status or bad body.
    pub async fn get(&self, id: &str) -> Result<Option<User>, ApiError> {
        let url = item_url(self.collection_url, id);
        fetch_optional(self.auth, &url).await
    }

    /// Public self-registration at `<users>/register`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded or the request fails
    /// before a response.
    pub async fn register(&self, user: &NewUser) -> Result<HttpResponse, ApiError> {
        let options = RequestOptions::new(Method::Post)
            .json(user)
            .map_err(ApiError::Encode)?;
        let url = item_url(self.collection_url, "register");
        let request = HttpRequest::new(url, options);
        Ok(self.auth.transport().send(request).await?)
    }

    /// `PUT` a partial user update.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch cannot be encoded or the authenticated
    /// request fails before a response.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<HttpResponse, ApiError> {
        let options = RequestOptions::new(Method::Put)
            .json(patch)
            .map_err(ApiError::Encode)?;
        let url = item_url(self.collection_url, id);
        Ok(self.auth.fetch_with_auth(&url, options).await?)
    }

    /// `DELETE` a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the authenticated request fails before a response.
    pub async fn delete(&self, id: &str) -> Result<HttpResponse, ApiError> {
        let options = RequestOptions::new(Method::Delete);
        let url = item_url(self.collection_url, id);
        Ok(self.auth.fetch_with_auth(&url, options).await?)
    }
}

//! `gloo-net` fetch transport for the browser (`hydrate`).
//!
//! Browser fetch has no built-in deadline, so each attempt races a
//! `gloo-timers` timeout and the loser is dropped (which aborts the wait, not
//! necessarily the underlying request).

use futures::future::{Either, select};
use gloo_net::http::{Method as GlooMethod, RequestBuilder};
use gloo_timers::future::TimeoutFuture;

use super::auth::AuthClient;
use super::http::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use crate::config::{ApiConfig, Timeouts};
use crate::state::session::{SessionStore, StorageError};

/// Auth client for the current tab: same-origin endpoints backed by the
/// tab's `sessionStorage`.
///
/// # Errors
///
/// Returns [`StorageError::Unavailable`] if session storage cannot be opened.
pub fn tab_client() -> Result<AuthClient<FetchTransport>, StorageError> {
    let config = ApiConfig::same_origin();
    let store = SessionStore::browser()?;
    let transport = FetchTransport::new(config.timeouts);
    Ok(AuthClient::new(transport, store, config.auth_endpoints()))
}

pub struct FetchTransport {
    request_timeout_secs: u64,
}

impl FetchTransport {
    #[must_use]
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            request_timeout_secs: timeouts.request_secs,
        }
    }

    async fn attempt(request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => GlooMethod::GET,
            Method::Post => GlooMethod::POST,
            Method::Put => GlooMethod::PUT,
            Method::Patch => GlooMethod::PATCH,
            Method::Delete => GlooMethod::DELETE,
        };
        let mut builder = RequestBuilder::new(&request.url).method(method);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let built = match request.body {
            Some(body) => builder.body(body),
            None => builder.build(),
        }
        .map_err(|e| TransportError::Request(e.to_string()))?;

        let response = built
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait::async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let secs = self.request_timeout_secs;
        let millis = u32::try_from(secs.saturating_mul(1000)).unwrap_or(u32::MAX);
        let fetch = Box::pin(Self::attempt(request));
        let deadline = Box::pin(TimeoutFuture::new(millis));
        match select(fetch, deadline).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(((), _)) => Err(TransportError::Timeout { secs }),
        }
    }
}

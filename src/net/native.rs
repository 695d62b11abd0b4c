//! `reqwest`-backed transport for native builds (CLI, integration tests).

use std::time::Duration;

use super::http::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use crate::config::Timeouts;

pub struct ReqwestTransport {
    http: reqwest::Client,
    request_timeout_secs: u64,
}

impl ReqwestTransport {
    /// Build a transport whose every attempt is bounded by `timeouts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(timeouts: Timeouts) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            request_timeout_secs: timeouts.request_secs,
        })
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                secs: self.request_timeout_secs,
            }
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait::async_trait(?Send)]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                self.map_error(&e)
            } else {
                TransportError::Body(e.to_string())
            }
        })?;
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            status,
            "http request completed"
        );
        Ok(HttpResponse { status, body })
    }
}

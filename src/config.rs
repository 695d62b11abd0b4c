//! API endpoint configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::net::auth::AuthEndpoints;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh-token";
pub const PRODUCTS_PATH: &str = "/api/products";
pub const USERS_PATH: &str = "/api/users";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A URL variable was set but empty.
    #[error("{var} must not be empty")]
    EmptyUrl { var: &'static str },

    /// A URL is neither http(s) nor an absolute path.
    #[error("{var} must be an http(s) URL or an absolute path, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Per-attempt network bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub login_url: String,
    pub refresh_url: String,
    pub products_url: String,
    pub users_url: String,
    pub timeouts: Timeouts,
}

impl ApiConfig {
    /// Derive every endpoint from one base URL using the default paths.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is empty or neither http(s) nor a path.
    pub fn from_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let base = validate_url("STOCKROOM_API_BASE_URL", base_url)?;
        let base = base.trim_end_matches('/');
        Ok(Self {
            login_url: format!("{base}{LOGIN_PATH}"),
            refresh_url: format!("{base}{REFRESH_PATH}"),
            products_url: format!("{base}{PRODUCTS_PATH}"),
            users_url: format!("{base}{USERS_PATH}"),
            timeouts: Timeouts::default(),
        })
    }

    /// Same-origin relative endpoints, for a front end served by the API host.
    #[must_use]
    pub fn same_origin() -> Self {
        Self {
            login_url: LOGIN_PATH.to_owned(),
            refresh_url: REFRESH_PATH.to_owned(),
            products_url: PRODUCTS_PATH.to_owned(),
            users_url: USERS_PATH.to_owned(),
            timeouts: Timeouts::default(),
        }
    }

    /// Build typed API config from environment variables.
    ///
    /// Optional:
    /// - `STOCKROOM_API_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `STOCKROOM_API_LOGIN`: login endpoint, default `<base>/api/auth/login`
    /// - `STOCKROOM_API_REFRESH_TOKEN`: refresh endpoint, default
    ///   `<base>/api/auth/refresh-token`
    /// - `STOCKROOM_API_PRODUCTS`: products collection, default `<base>/api/products`
    /// - `STOCKROOM_API_USERS`: users collection, default `<base>/api/users`
    /// - `STOCKROOM_REQUEST_TIMEOUT_SECS`: default 30
    /// - `STOCKROOM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if any URL variable is empty or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = std::env::var("STOCKROOM_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        Self::from_base_url(&base)?.with_env_overrides()
    }

    /// Apply per-endpoint and timeout overrides from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override URL is empty or malformed.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        override_url(&mut self.login_url, "STOCKROOM_API_LOGIN")?;
        override_url(&mut self.refresh_url, "STOCKROOM_API_REFRESH_TOKEN")?;
        override_url(&mut self.products_url, "STOCKROOM_API_PRODUCTS")?;
        override_url(&mut self.users_url, "STOCKROOM_API_USERS")?;
        let current = self.timeouts;
        self.timeouts = Timeouts {
            request_secs: env_parse_u64("STOCKROOM_REQUEST_TIMEOUT_SECS", current.request_secs),
            connect_secs: env_parse_u64("STOCKROOM_CONNECT_TIMEOUT_SECS", current.connect_secs),
        };
        Ok(self)
    }

    #[must_use]
    pub fn auth_endpoints(&self) -> AuthEndpoints {
        AuthEndpoints {
            login_url: self.login_url.clone(),
            refresh_url: self.refresh_url.clone(),
        }
    }
}

fn override_url(slot: &mut String, var: &'static str) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(var) {
        let url = validate_url(var, &raw)?;
        *slot = url.trim_end_matches('/').to_owned();
    }
    Ok(())
}

fn validate_url<'a>(var: &'static str, raw: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyUrl { var });
    }
    let is_http = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    if !is_http && !trimmed.starts_with('/') {
        return Err(ConfigError::InvalidUrl {
            var,
            value: trimmed.to_owned(),
        });
    }
    Ok(trimmed)
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

//! Networking modules for the admin REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `http` defines the transport seam, `auth` wraps it with the session
//! credential and refresh-and-retry, `api` exposes the products and users
//! collections, and `types` defines the shared wire schema. `native` and
//! `browser` are the two concrete transports.

pub mod api;
pub mod auth;
#[cfg(feature = "hydrate")]
pub mod browser;
pub mod http;
#[cfg(feature = "native")]
pub mod native;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

//! # stockroom
//!
//! Client core for the inventory admin panel: a tab-scoped session store, an
//! authenticated HTTP client that refreshes an expired session once and
//! retries, the protected-route gate, and the login and product form flows.
//!
//! The same core runs in the browser (`hydrate`: gloo-net transport and
//! `sessionStorage`) and natively (`native`: reqwest transport and in-memory
//! storage, used by the `stockroom` admin CLI).

pub mod config;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

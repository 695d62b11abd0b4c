//! Session state shared by the login flow, the route guard and the UI.

pub mod auth;
pub mod session;

//! Small helpers shared across front ends.

pub mod auth;

//! tokengate: user registration, per-user signed session tokens and a
//! token-gated resource, served over HTTP with axum.

pub mod auth;
pub mod config;
pub mod server;
pub mod web;

pub use tokengate_shared as shared;

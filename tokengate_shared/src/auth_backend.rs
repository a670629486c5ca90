//! Pluggable credential backend.
//!
//! Handlers only see this trait, so the cleartext store-backed registry can
//! be swapped for a hashing or external backend without touching callers.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("user already exists")]
    AlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
}

#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    /// Create a new user. Fails with `AlreadyExists` if the name is taken.
    async fn register(&self, username: &str, password: &str) -> Result<(), AuthError>;

    /// Check credentials. Does not reveal which of the two fields was wrong.
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError>;
}

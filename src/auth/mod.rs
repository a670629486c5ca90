//! Credential registration, token issuance and token validation.
//!
//! Two stores back this module: the credential table owned by
//! [`CredentialRegistry`] and the per-user secret table owned by
//! [`TokenService`]. A [`TokenValidator`] reads the secret table through the
//! service that owns it.
//!
//! Revocation works only through secret rotation: every successful login
//! replaces the user's secret, which invalidates every token issued before.
//! There is no blacklist.

pub mod registry;
pub mod secret;
pub mod token;
pub mod validator;

pub use registry::CredentialRegistry;
pub use secret::generate_secret;
pub use token::{Claims, TokenService};
pub use tokengate_shared::{AuthBackend, AuthError};
pub use validator::TokenValidator;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("no secret for user")]
    UnknownUser,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

//! Token issuance.
//!
//! A token is an HS256 JWT carrying `{sub, exp}` and signed with the user's
//! current secret. Nothing about the token itself is stored server-side.

use crate::auth::TokenError;
use crate::auth::secret::generate_secret;
use crate::auth::validator::TokenValidator;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokengate_shared::ConcurrentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Expiry as a Unix timestamp (seconds).
    pub exp: u64,
}

pub struct TokenService {
    secrets: Arc<ConcurrentStore>,
    ttl: chrono::Duration,
    secret_length: usize,
}

impl TokenService {
    pub fn new(secrets: Arc<ConcurrentStore>, ttl: chrono::Duration, secret_length: usize) -> Self {
        Self {
            secrets,
            ttl,
            secret_length,
        }
    }

    /// Mint a token for `username`, rotating the user's secret.
    ///
    /// Every token issued earlier for the same user stops validating. Two
    /// concurrent calls for the same user race; whichever secret is stored
    /// last decides which of the two tokens is accepted.
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit issuance time.
    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;
        let exp = u64::try_from(expires.timestamp())
            .map_err(|_| TokenError::Signing("token expiry before the epoch".to_string()))?;
        let secret = generate_secret(self.secret_length);
        let claims = Claims {
            sub: username.to_string(),
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;
        // Only rotate once signing succeeded.
        self.secrets.put(username, &secret);
        tracing::debug!(user = %username, exp, "Issued token");
        Ok(token)
    }

    /// A validator that reads this service's secret table.
    pub fn validator(&self) -> TokenValidator {
        TokenValidator::new(self.secrets.clone())
    }
}

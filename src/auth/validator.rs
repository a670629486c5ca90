//! Token validation against the current per-user secret.
//!
//! Checks run in a fixed order: structure, known user, signature, expiry.
//! Nothing is cached; every call re-reads the secret table, so a rotated
//! secret takes effect immediately.

use crate::auth::TokenError;
use crate::auth::token::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use std::sync::Arc;
use tokengate_shared::ConcurrentStore;

#[derive(Clone)]
pub struct TokenValidator {
    secrets: Arc<ConcurrentStore>,
}

impl TokenValidator {
    pub(crate) fn new(secrets: Arc<ConcurrentStore>) -> Self {
        Self { secrets }
    }

    /// Returns the username the token was issued to if it is valid now.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let claimed = self.peek_claims(token)?;

        let secret = self
            .secrets
            .get(&claimed.sub)
            .ok_or(TokenError::UnknownUser)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })?;

        Ok(data.claims.sub)
    }

    /// Decodes the claims without checking the signature or expiry.
    ///
    /// Only used to find out whose secret to verify against.
    pub fn peek_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenService;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn service() -> (TokenService, Arc<ConcurrentStore>) {
        let secrets = Arc::new(ConcurrentStore::new());
        (
            TokenService::new(secrets.clone(), chrono::Duration::days(7), 64),
            secrets,
        )
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        (Utc::now() + chrono::Duration::days(1)).timestamp() as u64
    }

    #[test]
    fn test_valid_token() {
        let (service, _) = service();
        let token = service.issue("alice").unwrap();
        assert_eq!(service.validator().validate(&token).unwrap(), "alice");
    }

    #[test]
    fn test_rotation_invalidates_previous_token() {
        let (service, _) = service();
        let validator = service.validator();
        let first = service.issue("alice").unwrap();
        assert!(validator.validate(&first).is_ok());
        let second = service.issue("alice").unwrap();
        assert_eq!(validator.validate(&first), Err(TokenError::BadSignature));
        assert_eq!(validator.validate(&second).unwrap(), "alice");
    }

    #[test]
    fn test_expired_token() {
        let (service, _) = service();
        let issued = Utc::now() - chrono::Duration::days(8);
        let token = service.issue_at("alice", issued).unwrap();
        assert_eq!(service.validator().validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_malformed_token() {
        let (service, _) = service();
        let validator = service.validator();
        assert_eq!(validator.validate("invalidtoken"), Err(TokenError::Malformed));
        assert_eq!(validator.validate(""), Err(TokenError::Malformed));
        assert_eq!(validator.validate("a.b.c"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_missing_expiry_is_malformed() {
        let (service, secrets) = service();
        secrets.put("alice", "known-secret");
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "alice" }),
            &EncodingKey::from_secret(b"known-secret"),
        )
        .unwrap();
        assert_eq!(service.validator().validate(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_unknown_user() {
        let (service, _) = service();
        let claims = Claims { sub: "ghost".to_string(), exp: far_future() };
        let token = sign(&claims, "whatever");
        assert_eq!(service.validator().validate(&token), Err(TokenError::UnknownUser));
    }

    #[test]
    fn test_forged_signature() {
        let (service, _) = service();
        service.issue("alice").unwrap();
        let claims = Claims { sub: "alice".to_string(), exp: far_future() };
        let forged = sign(&claims, "attacker-guess");
        assert_eq!(service.validator().validate(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_payload() {
        let (service, _) = service();
        service.issue("alice").unwrap();
        let token = service.issue("bob").unwrap();
        // Swap bob's payload for one claiming to be alice, keep bob's signature.
        let parts: Vec<&str> = token.split('.').collect();
        let alice_token = sign(
            &Claims { sub: "alice".to_string(), exp: far_future() },
            "irrelevant",
        );
        let alice_payload = alice_token.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], alice_payload, parts[2]);
        assert_eq!(service.validator().validate(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_bad_signature_checked_before_expiry() {
        let (service, _) = service();
        service.issue("alice").unwrap();
        let claims = Claims { sub: "alice".to_string(), exp: 1 };
        let forged = sign(&claims, "attacker-guess");
        assert_eq!(service.validator().validate(&forged), Err(TokenError::BadSignature));
    }
}

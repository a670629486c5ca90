//! Store-backed credential registry.
//!
//! Passwords are kept in cleartext, exactly as supplied. Anything that needs
//! hashing should implement [`AuthBackend`] instead of changing this type.

use async_trait::async_trait;
use std::sync::Arc;
use tokengate_shared::{AuthBackend, AuthError, ConcurrentStore};

pub struct CredentialRegistry {
    users: Arc<ConcurrentStore>,
}

impl CredentialRegistry {
    pub fn new(users: Arc<ConcurrentStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AuthBackend for CredentialRegistry {
    async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::BadRequest("username must not be empty"));
        }
        // Check and insert under one write lock so two racing registrations
        // of the same name cannot both succeed.
        if !self.users.put_if_absent(username, password) {
            return Err(AuthError::AlreadyExists);
        }
        tracing::info!(user = %username, "Registered user");
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        match self.users.get(username) {
            Some(stored) if constant_time_eq(stored.as_bytes(), password.as_bytes()) => Ok(()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Constant-time comparison for equal-length inputs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (CredentialRegistry, Arc<ConcurrentStore>) {
        let store = Arc::new(ConcurrentStore::new());
        (CredentialRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_register_twice_keeps_first_password() {
        let (registry, store) = registry();
        registry.register("alice", "secret1").await.unwrap();
        let second = registry.register("alice", "other").await;
        assert_eq!(second, Err(AuthError::AlreadyExists));
        assert_eq!(store.get("alice").as_deref(), Some("secret1"));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_username() {
        let (registry, store) = registry();
        assert!(matches!(
            registry.register("", "pw").await,
            Err(AuthError::BadRequest(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (registry, _) = registry();
        registry.register("alice", "secret1").await.unwrap();
        assert!(registry.authenticate("alice", "secret1").await.is_ok());
        assert_eq!(
            registry.authenticate("alice", "secret2").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            registry.authenticate("alice", "secret").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            registry.authenticate("mallory", "secret1").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let (registry, store) = registry();
        let registry = Arc::new(registry);
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register("dup", &format!("pw{i}")).await.is_ok()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"test", b"test"));
        assert!(!constant_time_eq(b"test", b"tesT"));
        assert!(!constant_time_eq(b"test", b"test_longer"));
    }
}

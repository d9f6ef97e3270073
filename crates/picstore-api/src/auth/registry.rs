//! In-memory user registry.
//!
//! The set of claimed usernames is process-wide shared state. Registration
//! performs its duplicate check and insert under a single lock guard, so two
//! concurrent registrations of the same name cannot both succeed. Password
//! hashing runs on the blocking pool, outside the lock.

use picstore_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const USERNAME_MIN_LEN: usize = 2;
const USERNAME_MAX_LEN: usize = 32;
const PASSWORD_MIN_LEN: usize = 8;

#[derive(Clone)]
struct StoredUser {
    password_hash: String,
    admin: bool,
}

/// Registry of known users, keyed by username.
#[derive(Clone, Default)]
pub struct UserRegistry {
    users: Arc<Mutex<HashMap<String, StoredUser>>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user. Fails with `UsernameTaken` if the name is claimed.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), AppError> {
        validate_username(username)?;
        validate_password(password)?;

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || {
            bcrypt::hash(password, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        // Check-and-insert under one guard so concurrent registrations of the
        // same name serialize here
        let mut users = self.users.lock().await;
        if users.contains_key(username) {
            return Err(AppError::UsernameTaken(username.to_string()));
        }
        users.insert(
            username.to_string(),
            StoredUser {
                password_hash,
                admin: false,
            },
        );

        tracing::info!(username = %username, "User registered");

        Ok(())
    }

    /// Verify credentials; returns the user's admin flag on success.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool, AppError> {
        let user = {
            let users = self.users.lock().await;
            users.get(username).cloned()
        };

        let Some(user) = user else {
            return Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))?;

        if !matches {
            return Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }

        Ok(user.admin)
    }
}

/// Usernames become storage-key prefixes, so the charset is restricted to
/// characters that are safe in keys and URLs.
fn validate_username(username: &str) -> Result<(), AppError> {
    if username.len() < USERNAME_MIN_LEN || username.len() > USERNAME_MAX_LEN {
        return Err(AppError::InvalidInput(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::InvalidInput(
            "Username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < PASSWORD_MIN_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_then_verify() {
        let registry = UserRegistry::new();
        registry.register("alice", "correct-horse").await.unwrap();

        let admin = registry.verify("alice", "correct-horse").await.unwrap();
        assert!(!admin);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let registry = UserRegistry::new();
        registry.register("alice", "correct-horse").await.unwrap();

        let result = registry.verify("alice", "wrong-horse!").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let registry = UserRegistry::new();
        let result = registry.verify("nobody", "password123").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = UserRegistry::new();
        registry.register("alice", "correct-horse").await.unwrap();

        let result = registry.register("alice", "other-password").await;
        assert!(matches!(result, Err(AppError::UsernameTaken(_))));
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let registry = UserRegistry::new();

        let attempts = (0..8).map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.register("alice", &format!("password-{:02}", i)).await })
        });

        let results = futures::future::join_all(attempts).await;
        let successes = results
            .into_iter()
            .map(|r| r.expect("task panicked"))
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_username_charset_enforced() {
        let registry = UserRegistry::new();

        let result = registry.register("bad/name", "password123").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = registry.register("a", "password123").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let registry = UserRegistry::new();
        let result = registry.register("alice", "short").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}

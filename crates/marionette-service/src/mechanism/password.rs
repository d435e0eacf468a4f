//! Argon2 credentials and the htpasswd file used by `basic-credential`.

use std::collections::HashMap;
use std::path::Path;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Hashes a password using Argon2id with a random salt.
///
/// ## Errors
/// Returns an error if password hashing fails.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Failed to hash password: {e}")))
}

/// ## Summary
/// Verifies a password against a stored Argon2 PHC string.
///
/// ## Errors
/// Returns `InvalidConfiguration` for a malformed hash and `NotAuthenticated`
/// when the password does not match.
pub fn verify_password(password: &str, password_hash: &str) -> ServiceResult<()> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid password hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|err| {
            tracing::trace!("Password verification failed: {}", err);
            ServiceError::NotAuthenticated
        })
}

/// `user:hash` lines; blank lines and `#` comments are ignored.
#[derive(Debug, Clone, Default)]
pub struct Htpasswd {
    entries: HashMap<String, String>,
}

impl Htpasswd {
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let parsed = line.split_once(':');
                if parsed.is_none() {
                    tracing::warn!("Skipping htpasswd line without ':' separator");
                }
                parsed
            })
            .map(|(user, hash)| (user.trim().to_string(), hash.trim().to_string()))
            .collect();
        Self { entries }
    }

    /// ## Errors
    /// Returns `MissingHtpasswd` if the file does not exist.
    pub fn load(path: &Path) -> ServiceResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ServiceError::MissingHtpasswd(path.display().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Unknown users and malformed hashes never verify.
    #[must_use]
    pub fn verify(&self, user: &str, password: &str) -> bool {
        let Some(hash) = self.entries.get(user) else {
            tracing::debug!(user, "No htpasswd entry for user");
            return false;
        };
        match verify_password(password, hash) {
            Ok(()) => true,
            Err(ServiceError::NotAuthenticated) => false,
            Err(err) => {
                tracing::warn!(user, error = %err, "Unusable htpasswd entry");
                false
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("test_password_123").expect("Failed to hash password");

        assert!(verify_password("test_password_123", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong_password", &hash),
            Err(ServiceError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_verify_invalid_hash_format() {
        assert!(matches!(
            verify_password("password", "not_a_valid_hash"),
            Err(ServiceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_htpasswd_verify() {
        let hash = hash_password("s3cret").expect("Failed to hash password");
        let htpasswd = Htpasswd::parse(&format!(
            "# agents\nnode1:{hash}\n\nbroken-line\nnode2:plaintext\n"
        ));

        assert_eq!(htpasswd.len(), 2);
        assert!(htpasswd.verify("node1", "s3cret"));
        assert!(!htpasswd.verify("node1", "guess"));
        assert!(!htpasswd.verify("node2", "plaintext"));
        assert!(!htpasswd.verify("node3", "s3cret"));
    }

    #[test]
    fn test_missing_htpasswd_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            Htpasswd::load(&dir.path().join("htpasswd")),
            Err(ServiceError::MissingHtpasswd(_))
        ));
    }
}

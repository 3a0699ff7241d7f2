//! Credential store: account creation and password verification
//!
//! Passwords are hashed with Argon2id and a per-account random salt (PHC
//! string format). Plaintext passwords are never persisted or logged.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::Database;
use crate::types::account::Account;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// Verified against when the username is unknown, so verification work does
/// not depend on whether the account exists. Hash of an unguessable filler
/// value; no real account ever stores it.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/45WwPsVakL5L/WAJzHaHHd553NTttc";

/// Stateless facade over the account table
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    /// Create a new credential store backed by the given database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new account.
    ///
    /// Validates username and password length before any hashing is done.
    pub fn create_account(&self, username: &str, email: &str, password: &str) -> Result<Account> {
        let username = username.trim();
        let email = email.trim();

        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(Error::InvalidUsername(format!(
                "must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::WeakPassword(format!(
                "must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        let account = Account::new(username.to_string(), email.to_string(), password_hash);
        self.db.insert_account(&account)?;

        tracing::info!(username = %account.username, "account created");
        Ok(account)
    }

    /// Verify a username/password pair.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller; both take a full hash verification.
    pub fn verify(&self, username: &str, password: &str) -> Result<Account> {
        let account = self.db.get_account_by_username(username.trim())?;

        let stored_hash = account
            .as_ref()
            .map(|a| a.password_hash.as_str())
            .unwrap_or(DUMMY_HASH);

        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {}", e)))?;

        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        match account {
            Some(account) if valid => Ok(account),
            _ => Err(Error::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn create_then_verify_roundtrip() {
        let store = store();
        let account = store
            .create_account("alice", "alice@example.com", "hunter22")
            .unwrap();

        let verified = store.verify("alice", "hunter22").unwrap();
        assert_eq!(verified.id, account.id);
    }

    #[test]
    fn wrong_password_fails() {
        let store = store();
        store
            .create_account("alice", "alice@example.com", "hunter22")
            .unwrap();

        let err = store.verify("alice", "hunter23").unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }

    #[test]
    fn unknown_username_fails_identically() {
        let store = store();
        let err = store.verify("nobody", "whatever").unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }

    #[test]
    fn short_username_is_rejected_before_hashing() {
        let store = store();
        let err = store
            .create_account("ab", "ab@example.com", "hunter22")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUsername(_)));
    }

    #[test]
    fn short_password_is_rejected_before_hashing() {
        let store = store();
        let err = store
            .create_account("alice", "alice@example.com", "12345")
            .unwrap_err();
        assert!(matches!(err, Error::WeakPassword(_)));
    }

    #[test]
    fn duplicates_are_rejected() {
        let store = store();
        store
            .create_account("alice", "alice@example.com", "hunter22")
            .unwrap();

        let err = store
            .create_account("alice", "new@example.com", "hunter22")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername));

        let err = store
            .create_account("alice2", "alice@example.com", "hunter22")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
    }

    #[test]
    fn password_hash_is_salted_per_account() {
        let store = store();
        let a = store
            .create_account("alice", "alice@example.com", "hunter22")
            .unwrap();
        let b = store
            .create_account("bob", "bob@example.com", "hunter22")
            .unwrap();
        assert_ne!(a.password_hash, b.password_hash);
        assert!(!a.password_hash.contains("hunter22"));
    }
}

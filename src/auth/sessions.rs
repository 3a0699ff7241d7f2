//! Session manager: issuing, validating, and revoking login sessions

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::Database;
use crate::types::account::{Account, Session};

/// Issues and validates opaque session tokens.
///
/// A session is Active until its TTL elapses (Expired) or the user logs out
/// (Revoked). Both terminal states look identical to callers: the token no
/// longer resolves.
pub struct SessionManager {
    db: Arc<Database>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a session manager with the given TTL in seconds
    pub fn new(db: Arc<Database>, ttl_secs: u64) -> Self {
        Self {
            db,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Start a new session for an authenticated account
    pub fn start_session(&self, account: &Account) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            token: generate_token(),
            account_id: account.id,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.db.insert_session(&session)?;
        tracing::debug!(account_id = %account.id, "session started");
        Ok(session)
    }

    /// Resolve a token to its account.
    ///
    /// Fails closed: an absent or expired token never resolves. Expired rows
    /// are deleted on detection.
    pub fn validate(&self, token: &str) -> Result<Account> {
        self.validate_at(token, Utc::now())
    }

    fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Account> {
        let session = self.db.get_session(token)?.ok_or(Error::SessionNotFound)?;

        if session.is_expired_at(now) {
            self.db.delete_session(token)?;
            return Err(Error::SessionExpired);
        }

        self.db
            .get_account(session.account_id)?
            .ok_or(Error::SessionNotFound)
    }

    /// End a session. Idempotent; ending a non-existent session is not an
    /// error.
    pub fn end_session(&self, token: &str) -> Result<()> {
        self.db.delete_session(token)
    }

    /// Remove all expired session rows (housekeeping sweep)
    pub fn purge_expired(&self) -> Result<usize> {
        self.db.purge_expired_sessions(Utc::now())
    }
}

/// 32 bytes from the OS RNG, hex-encoded: 256 bits of entropy
fn generate_token() -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialStore;

    fn setup() -> (SessionManager, Account) {
        let db = Arc::new(Database::in_memory().unwrap());
        let account = CredentialStore::new(Arc::clone(&db))
            .create_account("alice", "alice@example.com", "hunter22")
            .unwrap();
        (SessionManager::new(db, 7 * 24 * 3600), account)
    }

    #[test]
    fn start_then_validate() {
        let (sessions, account) = setup();
        let session = sessions.start_session(&account).unwrap();

        let resolved = sessions.validate(&session.token).unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[test]
    fn tokens_are_long_and_unique() {
        let (sessions, account) = setup();
        let a = sessions.start_session(&account).unwrap();
        let b = sessions.start_session(&account).unwrap();

        assert_eq!(a.token.len(), 64);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn unknown_token_fails_closed() {
        let (sessions, _) = setup();
        let err = sessions.validate("deadbeef").unwrap_err();
        assert!(matches!(err, Error::SessionNotFound));
    }

    #[test]
    fn validation_around_the_expiry_boundary() {
        let (sessions, account) = setup();
        let session = sessions.start_session(&account).unwrap();

        let just_before = session.expires_at - Duration::seconds(1);
        assert!(sessions.validate_at(&session.token, just_before).is_ok());

        let just_after = session.expires_at + Duration::seconds(1);
        let err = sessions
            .validate_at(&session.token, just_after)
            .unwrap_err();
        assert!(matches!(err, Error::SessionExpired));

        // The expired row was deleted; a later validate sees no session
        let err = sessions.validate(&session.token).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound));
    }

    #[test]
    fn logout_is_idempotent_and_terminal() {
        let (sessions, account) = setup();
        let session = sessions.start_session(&account).unwrap();

        sessions.end_session(&session.token).unwrap();
        sessions.end_session(&session.token).unwrap();

        let err = sessions.validate(&session.token).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound));
    }
}

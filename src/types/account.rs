//! Account and session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user account.
///
/// Username and email are globally unique. The password hash is an Argon2id
/// PHC string and is never serialized or logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Argon2id password hash (PHC string format)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a fresh ID
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// An authenticated login session.
///
/// The token is opaque to clients; a session resolves to exactly one account
/// until it expires or is revoked, after which it behaves as if it never
/// existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token (hex-encoded, 256 bits of entropy)
    pub token: String,
    /// Owning account ID
    pub account_id: Uuid,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp (creation + configured TTL)
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether this session is expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

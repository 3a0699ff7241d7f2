//! SQLite database for accounts, sessions, and document metadata
//!
//! Chunk embeddings live in the vector index; everything else that must
//! survive a restart lives here.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::account::{Account, Session};
use crate::types::document::{Document, FileType};

/// SQLite-backed store.
///
/// The connection is serialized behind a mutex; callers hold it only for the
/// duration of a single statement or a short pre-check + insert pair, which
/// makes uniqueness checks race-free.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::Database(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES accounts(id),
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_account_id ON sessions(account_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES accounts(id),
                filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                text_len INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_account_id ON documents(account_id);
        "#,
        )
        .map_err(|e| Error::Database(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // ==================== Account Operations ====================

    /// Insert a new account.
    ///
    /// Fails with `DuplicateUsername`/`DuplicateEmail` when the unique
    /// constraints would be violated. The checks and the insert run under the
    /// same connection lock, so they are atomic.
    pub fn insert_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn.lock();

        let username_taken: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
                params![account.username],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("Failed to check username: {}", e)))?;
        if username_taken {
            return Err(Error::DuplicateUsername);
        }

        let email_taken: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
                params![account.email],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("Failed to check email: {}", e)))?;
        if email_taken {
            return Err(Error::DuplicateEmail);
        }

        conn.execute(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                account.id.to_string(),
                account.username,
                account.email,
                account.password_hash,
                account.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to insert account: {}", e)))?;

        Ok(())
    }

    /// Get an account by username
    pub fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT * FROM accounts WHERE username = ?1")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let account = stmt
            .query_row(params![username], row_to_account)
            .optional()
            .map_err(|e| Error::Database(format!("Failed to get account: {}", e)))?;

        Ok(account)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT * FROM accounts WHERE id = ?1")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let account = stmt
            .query_row(params![id.to_string()], row_to_account)
            .optional()
            .map_err(|e| Error::Database(format!("Failed to get account: {}", e)))?;

        Ok(account)
    }

    // ==================== Session Operations ====================

    /// Insert a new session
    pub fn insert_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO sessions (token, account_id, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                session.token,
                session.account_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to insert session: {}", e)))?;

        Ok(())
    }

    /// Get a session by token
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT * FROM sessions WHERE token = ?1")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let session = stmt
            .query_row(params![token], row_to_session)
            .optional()
            .map_err(|e| Error::Database(format!("Failed to get session: {}", e)))?;

        Ok(session)
    }

    /// Delete a session; deleting a non-existent token is not an error
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| Error::Database(format!("Failed to delete session: {}", e)))?;

        Ok(())
    }

    /// Delete all sessions that expired at or before `now`; returns the count
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();

        let count = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![now.to_rfc3339()],
            )
            .map_err(|e| Error::Database(format!("Failed to purge sessions: {}", e)))?;

        Ok(count)
    }

    // ==================== Document Operations ====================

    /// Insert a document record
    pub fn insert_document(&self, doc: &Document) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO documents (
                id, account_id, filename, file_type, text_len,
                total_chunks, content_hash, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                doc.id.to_string(),
                doc.account_id.to_string(),
                doc.filename,
                file_type_to_extension(doc.file_type),
                doc.text_len as i64,
                doc.total_chunks as i64,
                doc.content_hash,
                doc.uploaded_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to insert document: {}", e)))?;

        Ok(())
    }

    /// Get a document by ID (no owner filter; the coordinator checks
    /// ownership to distinguish NotOwner from NotFound internally)
    pub fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT * FROM documents WHERE id = ?1")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let doc = stmt
            .query_row(params![id.to_string()], row_to_document)
            .optional()
            .map_err(|e| Error::Database(format!("Failed to get document: {}", e)))?;

        Ok(doc)
    }

    /// List all documents owned by an account, newest first
    pub fn list_documents(&self, account_id: Uuid) -> Result<Vec<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT * FROM documents WHERE account_id = ?1 ORDER BY uploaded_at DESC")
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let docs = stmt
            .query_map(params![account_id.to_string()], row_to_document)
            .map_err(|e| Error::Database(format!("Failed to list documents: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(docs)
    }

    /// Count documents owned by an account
    pub fn count_documents(&self, account_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE account_id = ?1",
                params![account_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("Failed to count documents: {}", e)))?;

        Ok(count as usize)
    }

    /// Delete a document row; returns whether a row was removed
    pub fn delete_document(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock();

        let count = conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
            .map_err(|e| Error::Database(format!("Failed to delete document: {}", e)))?;

        Ok(count > 0)
    }
}

// Helper functions

fn file_type_to_extension(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Pdf => "pdf",
        FileType::Docx => "docx",
        FileType::Txt => "txt",
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let email: String = row.get(2)?;
    let password_hash: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;

    Ok(Account {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        username,
        email,
        password_hash,
        created_at: parse_datetime(&created_at_str),
    })
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let token: String = row.get(0)?;
    let account_id_str: String = row.get(1)?;
    let created_at_str: String = row.get(2)?;
    let expires_at_str: String = row.get(3)?;

    Ok(Session {
        token,
        account_id: Uuid::parse_str(&account_id_str).unwrap_or_else(|_| Uuid::nil()),
        created_at: parse_datetime(&created_at_str),
        expires_at: parse_datetime(&expires_at_str),
    })
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let id_str: String = row.get(0)?;
    let account_id_str: String = row.get(1)?;
    let filename: String = row.get(2)?;
    let file_type_str: String = row.get(3)?;
    let text_len: i64 = row.get(4)?;
    let total_chunks: i64 = row.get(5)?;
    let content_hash: String = row.get(6)?;
    let uploaded_at_str: String = row.get(7)?;

    Ok(Document {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        account_id: Uuid::parse_str(&account_id_str).unwrap_or_else(|_| Uuid::nil()),
        filename,
        file_type: FileType::from_extension(&file_type_str).unwrap_or(FileType::Txt),
        text_len: text_len as u64,
        total_chunks: total_chunks as u32,
        content_hash,
        uploaded_at: parse_datetime(&uploaded_at_str),
    })
}

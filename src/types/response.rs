//! Response types for the HTTP boundary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::{Account, Session};
use super::document::{Document, FileType};

/// A chunk retrieved for a question, with enough provenance for the
/// generation collaborator (or the UI) to cite its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Source document ID
    pub document_id: Uuid,
    /// Source document filename
    pub filename: String,
    /// Ordinal position of the chunk within its document
    pub ordinal: u32,
    /// Chunk text content
    pub text: String,
    /// Similarity score (0.0-1.0, higher is more similar)
    pub score: f32,
}

/// Response from a query: the ranked chunks, plus a generated answer when a
/// generation collaborator is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer (absent when generation is disabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Retrieved chunks, ordered by descending similarity
    pub chunks: Vec<RetrievedChunk>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Summary of an account (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            created_at: account.created_at,
        }
    }
}

/// Response from a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque session token for subsequent requests
    pub token: String,
    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for LoginResponse {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token.clone(),
            expires_at: session.expires_at,
        }
    }
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// Filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Number of chunks created
    pub total_chunks: u32,
    /// Byte length of the extracted text
    pub text_len: u64,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            file_type: doc.file_type,
            total_chunks: doc.total_chunks,
            text_len: doc.text_len,
            uploaded_at: doc.uploaded_at,
        }
    }
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether any file was successfully ingested
    pub success: bool,
    /// Ingested documents
    pub documents: Vec<DocumentSummary>,
    /// Total chunks created across all documents
    pub total_chunks_created: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Per-file errors (partial success)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<IngestError>,
}

/// Error during ingestion of a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// Response for listing documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    /// The caller's documents
    pub documents: Vec<DocumentSummary>,
    /// Total count
    pub total_count: usize,
}

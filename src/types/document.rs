//! Document and chunk types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
}

impl FileType {
    /// Detect file type from extension; `None` for anything unsupported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Detect file type from a filename suffix
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("");
        // A bare name with no dot has no extension
        if ext.len() == filename.len() {
            return None;
        }
        Self::from_extension(ext)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
        }
    }
}

/// A document that has been ingested.
///
/// Every document belongs to exactly one account; its chunks live in the
/// vector index and are deleted together with the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Owning account ID
    pub account_id: Uuid,
    /// Original filename as uploaded by the user
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Byte length of the extracted, normalized text
    pub text_len: u64,
    /// Number of chunks created during ingestion
    pub total_chunks: u32,
    /// SHA-256 hash of the extracted text
    pub content_hash: String,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document record with a fresh ID.
    ///
    /// Re-uploading the same filename always produces a new document; there
    /// is no implicit overwrite.
    pub fn new(
        account_id: Uuid,
        filename: String,
        file_type: FileType,
        text_len: u64,
        total_chunks: u32,
        content_hash: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            filename,
            file_type,
            text_len,
            total_chunks,
            content_hash,
            uploaded_at: Utc::now(),
        }
    }
}

//! Error types for the document Q&A service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// All failure kinds surfaced by the service.
///
/// Account, session, and upload failures are user-actionable and propagate to
/// the HTTP boundary unchanged. `NotOwner` exists internally so the
/// coordinator can distinguish an isolation violation from a missing row, but
/// the two are indistinguishable in responses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Account creation
    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Weak password: {0}")]
    WeakPassword(String),

    // Authentication
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,

    // Extraction
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("No text content could be extracted from the document")]
    EmptyExtraction,

    #[error("File is corrupt or malformed: {0}")]
    CorruptFile(String),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    // Chunking
    #[error("Invalid chunk configuration: {0}")]
    InvalidChunkConfig(String),

    // Retrieval
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("No documents have been uploaded for this account")]
    NoDocuments,

    #[error("Document is owned by another account")]
    NotOwner,

    #[error("Document not found")]
    NotFound,

    // Internal
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status for this error kind.
    ///
    /// `NotOwner` deliberately maps to the same status as `NotFound` so the
    /// existence of another account's documents never leaks.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateUsername | Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::InvalidUsername(_) | Self::WeakPassword(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials | Self::SessionExpired | Self::SessionNotFound => {
                StatusCode::UNAUTHORIZED
            }
            Self::UnsupportedExtension(_)
            | Self::EmptyExtraction
            | Self::CorruptFile(_)
            | Self::InvalidChunkConfig(_) => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NoDocuments => StatusCode::NOT_FOUND,
            Self::NotOwner | Self::NotFound => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client.
    fn public_message(&self) -> String {
        match self {
            // Same body for both, see status_code.
            Self::NotOwner | Self::NotFound => "Document not found".to_string(),
            // Internal details stay in the logs.
            Self::Database(_) | Self::Internal(_) | Self::Io(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_owner_is_indistinguishable_from_not_found() {
        assert_eq!(Error::NotOwner.status_code(), Error::NotFound.status_code());
        assert_eq!(
            Error::NotOwner.public_message(),
            Error::NotFound.public_message()
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = Error::Database("UNIQUE constraint failed: accounts.username".to_string());
        assert!(!err.public_message().contains("UNIQUE"));
    }
}

//! Document ingestion endpoint

use axum::{
    extract::{Extension, Multipart, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::middleware::AuthAccount;
use crate::server::state::AppState;
use crate::types::response::{DocumentSummary, IngestError, IngestResponse};

/// POST /api/ingest - Upload and process files for the authenticated account.
///
/// Accepts one or more files in a multipart body. Files are processed
/// independently; a bad file is reported per-file and does not fail the
/// whole request.
pub async fn ingest_files(
    State(state): State<AppState>,
    Extension(AuthAccount(owner)): Extension<AuthAccount>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let mut documents = Vec::new();
    let mut errors = Vec::new();
    let mut total_chunks = 0u32;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            // Non-file fields are ignored
            continue;
        };

        let data = match field.bytes().await {
            Ok(d) => d,
            Err(e) => {
                errors.push(IngestError {
                    filename,
                    error: format!("Failed to read file: {}", e),
                });
                continue;
            }
        };

        tracing::info!(owner = %owner, filename = %filename, bytes = data.len(), "processing upload");

        match state.coordinator().ingest(owner, &filename, &data).await {
            Ok(doc) => {
                total_chunks += doc.total_chunks;
                documents.push(DocumentSummary::from(&doc));
            }
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "ingest failed");
                errors.push(IngestError {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(IngestResponse {
        success: !documents.is_empty(),
        documents,
        total_chunks_created: total_chunks,
        processing_time_ms: start.elapsed().as_millis() as u64,
        errors,
    }))
}

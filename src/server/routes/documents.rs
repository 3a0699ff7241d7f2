//! Document management endpoints

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::middleware::AuthAccount;
use crate::server::state::AppState;
use crate::types::response::{DocumentListResponse, DocumentSummary};

/// GET /api/documents - List the authenticated account's documents
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(AuthAccount(owner)): Extension<AuthAccount>,
) -> Result<Json<DocumentListResponse>> {
    let documents: Vec<DocumentSummary> = state
        .coordinator()
        .list_documents(owner)?
        .iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentListResponse {
        total_count: documents.len(),
        documents,
    }))
}

/// DELETE /api/documents/:id - Delete a document and all its chunks.
///
/// A document owned by another account yields the same response as a
/// non-existent one.
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(AuthAccount(owner)): Extension<AuthAccount>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.coordinator().delete_document(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

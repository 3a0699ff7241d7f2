//! Query endpoint: owner-scoped retrieval plus optional answer generation

use axum::{
    extract::{Extension, State},
    Json,
};
use std::time::Instant;

use crate::error::Result;
use crate::server::middleware::AuthAccount;
use crate::server::state::AppState;
use crate::types::query::QueryRequest;
use crate::types::response::QueryResponse;

/// POST /api/query - Retrieve the chunks most relevant to a question.
///
/// When a generation collaborator is configured the retrieved chunks are
/// handed to it and the answer is included; the chunks themselves are always
/// returned so the caller can render citations.
pub async fn query(
    State(state): State<AppState>,
    Extension(AuthAccount(owner)): Extension<AuthAccount>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    let chunks = state
        .coordinator()
        .answer_context(owner, &request.question, request.top_k)
        .await?;

    let answer = match state.generator() {
        Some(generator) if !chunks.is_empty() => {
            Some(generator.generate(&request.question, &chunks).await?)
        }
        _ => None,
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        owner = %owner,
        chunks = chunks.len(),
        processing_time_ms,
        "query completed"
    );

    Ok(Json(QueryResponse {
        answer,
        chunks,
        processing_time_ms,
    }))
}

//! Vector index trait: owner-scoped storage and similarity search

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// A chunk record as written to the index.
///
/// The owner is attached at write time and is authoritative for all later
/// filtering; callers never get to substitute their own filter for it.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Unique chunk ID
    pub id: Uuid,
    /// Owning account ID
    pub owner: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Ordinal position within the document
    pub ordinal: u32,
    /// Chunk text
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// A chunk returned from a similarity query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Parent document ID
    pub document_id: Uuid,
    /// Ordinal position within the document
    pub ordinal: u32,
    /// Chunk text
    pub text: String,
    /// Cosine similarity (0.0-1.0, higher is more similar)
    pub score: f32,
}

/// Trait for vector storage and owner-scoped similarity search.
///
/// Implementations:
/// - `MemoryIndex`: in-process brute-force index (local mode, tests)
/// - `QdrantIndex`: remote Qdrant collection
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace chunk records
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<()>;

    /// Search for the `top_k` most similar chunks owned by `owner`.
    ///
    /// Results are ordered by descending similarity; ties break by smaller
    /// document ID, then smaller ordinal, so orderings are reproducible.
    /// Fewer than `top_k` matches is not an error.
    async fn query(&self, owner: Uuid, embedding: &[f32], top_k: usize)
        -> Result<Vec<ScoredChunk>>;

    /// Remove all chunks for an (owner, document) pair. Idempotent.
    async fn delete_document(&self, owner: Uuid, document_id: Uuid) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Deterministic ordering for scored chunks: descending score, then document
/// ID, then ordinal.
pub(crate) fn sort_scored(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
            .then_with(|| a.ordinal.cmp(&b.ordinal))
    });
}

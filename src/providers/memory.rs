//! In-process vector index
//!
//! Brute-force cosine search over a record list behind a read-write lock.
//! Serves as the single-node backend and as the test double for the remote
//! index; the owner tag stored with each record is the only filter applied
//! at query time.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;

use super::vector_index::{sort_scored, ChunkRecord, ScoredChunk, VectorIndex};

/// In-memory vector index
#[derive(Default)]
pub struct MemoryIndex {
    records: RwLock<Vec<ChunkRecord>>,
}

impl MemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, new_records: &[ChunkRecord]) -> Result<()> {
        let mut records = self.records.write();
        for record in new_records {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        owner: Uuid,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let records = self.records.read();

        let mut results: Vec<ScoredChunk> = records
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| ScoredChunk {
                document_id: r.document_id,
                ordinal: r.ordinal,
                text: r.text.clone(),
                score: cosine_similarity(embedding, &r.embedding),
            })
            .collect();

        sort_scored(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete_document(&self, owner: Uuid, document_id: Uuid) -> Result<()> {
        let mut records = self.records.write();
        records.retain(|r| !(r.owner == owner && r.document_id == document_id));
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Cosine similarity mapped to [0, 1]; zero-norm vectors score 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    ((dot / (norm_a * norm_b)) + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: Uuid, document_id: Uuid, ordinal: u32, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            id: Uuid::new_v4(),
            owner,
            document_id,
            ordinal,
            text: format!("chunk {}", ordinal),
            embedding,
        }
    }

    #[tokio::test]
    async fn query_is_scoped_to_the_owner() {
        let index = MemoryIndex::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();

        index
            .upsert(&[
                record(alice, doc_a, 0, vec![1.0, 0.0]),
                record(bob, doc_b, 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.query(alice, &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, doc_a);

        let results = index.query(bob, &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, doc_b);
    }

    #[tokio::test]
    async fn results_are_ranked_by_similarity() {
        let index = MemoryIndex::new();
        let owner = Uuid::new_v4();
        let doc = Uuid::new_v4();

        index
            .upsert(&[
                record(owner, doc, 0, vec![0.0, 1.0]),
                record(owner, doc, 1, vec![1.0, 0.0]),
                record(owner, doc, 2, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = index.query(owner, &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results[0].ordinal, 1);
        assert_eq!(results[1].ordinal, 2);
        assert_eq!(results[2].ordinal, 0);
    }

    #[tokio::test]
    async fn ties_break_by_document_then_ordinal() {
        let index = MemoryIndex::new();
        let owner = Uuid::new_v4();
        let mut docs = [Uuid::new_v4(), Uuid::new_v4()];
        docs.sort();

        index
            .upsert(&[
                record(owner, docs[1], 0, vec![1.0, 0.0]),
                record(owner, docs[0], 1, vec![1.0, 0.0]),
                record(owner, docs[0], 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.query(owner, &[1.0, 0.0], 3).await.unwrap();
        assert_eq!((results[0].document_id, results[0].ordinal), (docs[0], 0));
        assert_eq!((results[1].document_id, results[1].ordinal), (docs[0], 1));
        assert_eq!((results[2].document_id, results[2].ordinal), (docs[1], 0));
    }

    #[tokio::test]
    async fn top_k_bounds_the_result_length() {
        let index = MemoryIndex::new();
        let owner = Uuid::new_v4();
        let doc = Uuid::new_v4();

        for i in 0..10 {
            index
                .upsert(&[record(owner, doc, i, vec![1.0, i as f32])])
                .await
                .unwrap();
        }

        assert_eq!(index.query(owner, &[1.0, 0.0], 3).await.unwrap().len(), 3);
        // Fewer matches than top_k is not an error
        assert_eq!(index.query(owner, &[1.0, 0.0], 50).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn delete_document_removes_all_its_chunks_and_is_idempotent() {
        let index = MemoryIndex::new();
        let owner = Uuid::new_v4();
        let keep = Uuid::new_v4();
        let gone = Uuid::new_v4();

        index
            .upsert(&[
                record(owner, keep, 0, vec![1.0, 0.0]),
                record(owner, gone, 0, vec![1.0, 0.0]),
                record(owner, gone, 1, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        index.delete_document(owner, gone).await.unwrap();

        let results = index.query(owner, &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, keep);

        // Deleting again (or deleting something unknown) is not an error
        index.delete_document(owner, gone).await.unwrap();
        index.delete_document(owner, Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_replaces_records_with_the_same_id() {
        let index = MemoryIndex::new();
        let owner = Uuid::new_v4();
        let doc = Uuid::new_v4();

        let mut rec = record(owner, doc, 0, vec![1.0, 0.0]);
        index.upsert(std::slice::from_ref(&rec)).await.unwrap();

        rec.text = "updated".to_string();
        index.upsert(std::slice::from_ref(&rec)).await.unwrap();

        assert_eq!(index.len(), 1);
        let results = index.query(owner, &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].text, "updated");
    }
}
